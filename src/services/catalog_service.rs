use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::catalog::{BrandList, CategoryList, CreateNameRequest, TagList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Brand, Category, Tag},
    response::{ApiResponse, Meta},
};

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        None,
    ))
}

pub async fn list_brands(pool: &DbPool) -> AppResult<ApiResponse<BrandList>> {
    let items = sqlx::query_as::<_, Brand>("SELECT * FROM brands ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success("Brands", BrandList { items }, None))
}

pub async fn list_tags(pool: &DbPool) -> AppResult<ApiResponse<TagList>> {
    let items = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success("Tags", TagList { items }, None))
}

async fn create_named(
    pool: &DbPool,
    user: &AuthUser,
    table: &'static str,
    name: &str,
) -> AppResult<(Uuid, String)> {
    ensure_admin(user)?;
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let exist: Option<(Uuid,)> =
        sqlx::query_as(&format!("SELECT id FROM {table} WHERE name = $1"))
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest(format!("{name:?} already exists")));
    }

    let row: (Uuid, String) = sqlx::query_as(&format!(
        "INSERT INTO {table} (id, name) VALUES ($1, $2) RETURNING id, name"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "catalog_create",
        Some(table),
        Some(serde_json::json!({ "name": name })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(row)
}

pub async fn create_category(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateNameRequest,
) -> AppResult<ApiResponse<Category>> {
    let (id, name) = create_named(pool, user, "categories", &payload.name).await?;
    Ok(ApiResponse::success(
        "Category created",
        Category { id, name },
        Some(Meta::empty()),
    ))
}

pub async fn create_brand(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateNameRequest,
) -> AppResult<ApiResponse<Brand>> {
    let (id, name) = create_named(pool, user, "brands", &payload.name).await?;
    Ok(ApiResponse::success(
        "Brand created",
        Brand { id, name },
        Some(Meta::empty()),
    ))
}

pub async fn create_tag(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateNameRequest,
) -> AppResult<ApiResponse<Tag>> {
    let (id, name) = create_named(pool, user, "tags", &payload.name).await?;
    Ok(ApiResponse::success(
        "Tag created",
        Tag { id, name },
        Some(Meta::empty()),
    ))
}
