use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::discounts::{
        CreateDiscountRequest, DiscountList, DiscountWithProducts, UpdateDiscountRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Discount,
    response::ApiResponse,
    services::discount_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_discounts).post(create_discount))
        .route("/{id}", get(get_discount))
        .route("/{id}", put(update_discount))
        .route("/{id}", delete(delete_discount))
}

#[utoipa::path(
    get,
    path = "/api/discounts",
    responses(
        (status = 200, description = "All discounts", body = ApiResponse<DiscountList>)
    ),
    tag = "Discounts"
)]
pub async fn list_discounts(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DiscountList>>> {
    let resp = discount_service::list_discounts(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/discounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Discount ID")
    ),
    responses(
        (status = 200, description = "Discount with covered products", body = ApiResponse<DiscountWithProducts>),
        (status = 404, description = "Not found"),
    ),
    tag = "Discounts"
)]
pub async fn get_discount(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DiscountWithProducts>>> {
    let resp = discount_service::get_discount(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/discounts",
    request_body = CreateDiscountRequest,
    responses(
        (status = 200, description = "Discount created", body = ApiResponse<Discount>),
        (status = 400, description = "Invalid percent, dates or product set"),
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn create_discount(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDiscountRequest>,
) -> AppResult<Json<ApiResponse<Discount>>> {
    let resp = discount_service::create_discount(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/discounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Discount ID")
    ),
    request_body = UpdateDiscountRequest,
    responses(
        (status = 200, description = "Discount updated", body = ApiResponse<Discount>),
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn update_discount(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDiscountRequest>,
) -> AppResult<Json<ApiResponse<Discount>>> {
    let resp = discount_service::update_discount(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/discounts/{id}",
    params(
        ("id" = Uuid, Path, description = "Discount ID")
    ),
    responses(
        (status = 200, description = "Discount deleted"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn delete_discount(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = discount_service::delete_discount(&state, &user, id).await?;
    Ok(Json(resp))
}
