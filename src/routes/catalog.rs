use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::catalog::{BrandList, CategoryList, CreateNameRequest, TagList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Brand, Category, Tag},
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/brands", get(list_brands).post(create_brand))
        .route("/tags", get(list_tags).post(create_tag))
}

#[utoipa::path(get, path = "/api/categories", responses((status = 200, description = "All categories", body = ApiResponse<CategoryList>)), tag = "Catalog")]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/categories", request_body = CreateNameRequest, responses((status = 200, description = "Category created", body = ApiResponse<Category>)), security(("bearer_auth" = [])), tag = "Catalog")]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateNameRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::create_category(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/brands", responses((status = 200, description = "All brands", body = ApiResponse<BrandList>)), tag = "Catalog")]
pub async fn list_brands(State(state): State<AppState>) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = catalog_service::list_brands(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/brands", request_body = CreateNameRequest, responses((status = 200, description = "Brand created", body = ApiResponse<Brand>)), security(("bearer_auth" = [])), tag = "Catalog")]
pub async fn create_brand(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateNameRequest>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    let resp = catalog_service::create_brand(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/tags", responses((status = 200, description = "All tags", body = ApiResponse<TagList>)), tag = "Catalog")]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = catalog_service::list_tags(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/tags", request_body = CreateNameRequest, responses((status = 200, description = "Tag created", body = ApiResponse<Tag>)), security(("bearer_auth" = [])), tag = "Catalog")]
pub async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateNameRequest>,
) -> AppResult<Json<ApiResponse<Tag>>> {
    let resp = catalog_service::create_tag(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}
