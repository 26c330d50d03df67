use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query as SeaQuery};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::dto::products::{
    CreateProductRequest, ProductDetail, ProductList, StorefrontSummary, UpdateProductRequest,
};
use crate::{
    audit::log_audit,
    entity::{
        discounts::{Column as DiscountCol, Entity as Discounts},
        product_tags::{ActiveModel as ProductTagActive, Column as ProductTagCol, Entity as ProductTags},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Discount, Product},
    pricing::round_money,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

const SIZES: [&str; 4] = ["S", "M", "L", "XL"];

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(brand_id) = query.brand_id {
        condition = condition.add(Column::BrandId.eq(brand_id));
    }

    if let Some(tag_id) = query.tag_id {
        condition = condition.add(
            Column::Id.in_subquery(
                SeaQuery::select()
                    .column(ProductTagCol::ProductId)
                    .from(ProductTags)
                    .and_where(Expr::col(ProductTagCol::TagId).eq(tag_id))
                    .to_owned(),
            ),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.in_stock.unwrap_or(false) {
        condition = condition.add(Column::Stock.gt(0));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let (rating_avg, review_count): (Option<Decimal>, i64) =
        sqlx::query_as("SELECT AVG(rating), COUNT(*) FROM reviews WHERE product_id = $1")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;

    let detail = ProductDetail {
        product,
        rating_avg: rating_avg.map(round_money),
        review_count,
    };
    Ok(ApiResponse::success("Product", detail, None))
}

/// Landing payload: newest products, products most often ordered, the top
/// flagged discounts and the average catalog price.
pub async fn storefront(state: &AppState) -> AppResult<ApiResponse<StorefrontSummary>> {
    let new_products = Products::find()
        .order_by_desc(Column::CreatedAt)
        .limit(5)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let popular_products = sqlx::query_as::<_, Product>(
        r#"
        SELECT p.*
        FROM products p
        LEFT JOIN order_items oi ON oi.product_id = p.id
        GROUP BY p.id
        ORDER BY COUNT(oi.id) DESC, p.created_at DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let active_discounts = Discounts::find()
        .filter(DiscountCol::Active.eq(true))
        .order_by_desc(DiscountCol::Percent)
        .limit(5)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|d| Discount {
            id: d.id,
            name: d.name,
            percent: d.percent,
            active: d.active,
            start_date: d.start_date.with_timezone(&Utc),
            end_date: d.end_date.with_timezone(&Utc),
        })
        .collect();

    let avg_price: Option<Decimal> = sqlx::query_scalar("SELECT AVG(price) FROM products")
        .fetch_one(&state.pool)
        .await?;

    let summary = StorefrontSummary {
        site_title: state.config.site_title.clone(),
        new_products,
        popular_products,
        active_discounts,
        avg_price: avg_price.map(round_money),
    };
    Ok(ApiResponse::success("Storefront", summary, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_price(payload.price)?;
    validate_stock(payload.stock)?;
    validate_size(&payload.size)?;

    let txn = state.orm.begin().await?;

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        brand_id: Set(payload.brand_id),
        size: Set(payload.size),
        external_page: Set(payload.external_page),
        created_at: NotSet,
    };
    let product = active.insert(&txn).await?;

    for tag_id in payload.tag_ids {
        ProductTagActive {
            product_id: Set(id),
            tag_id: Set(tag_id),
            added_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        validate_stock(stock)?;
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(brand_id) = payload.brand_id {
        active.brand_id = Set(brand_id);
    }
    if let Some(size) = payload.size {
        validate_size(&size)?;
        active.size = Set(size);
    }
    if let Some(external_page) = payload.external_page {
        active.external_page = Set(Some(external_page));
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::Validation("stock must not be negative".into()));
    }
    Ok(())
}

fn validate_size(size: &str) -> AppResult<()> {
    if !SIZES.contains(&size) {
        return Err(AppError::Validation(format!(
            "size must be one of {SIZES:?}, got {size:?}"
        )));
    }
    Ok(())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        category_id: model.category_id,
        brand_id: model.brand_id,
        size: model.size,
        external_page: model.external_page,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
