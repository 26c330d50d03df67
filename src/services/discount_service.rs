use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Query as SeaQuery};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use crate::dto::discounts::{
    CreateDiscountRequest, DiscountList, DiscountStatusList, DiscountStatusRow,
    DiscountWithProducts, UpdateDiscountRequest,
};
use crate::{
    audit::log_audit,
    entity::{
        discount_products::{ActiveModel as DiscountProductActive, Column as DiscountProductCol, Entity as DiscountProducts},
        discounts::{ActiveModel, Column, Entity as Discounts, Model as DiscountModel},
        products::{Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Discount,
    pricing::schedule_status,
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

pub async fn list_discounts(state: &AppState) -> AppResult<ApiResponse<DiscountList>> {
    let items = Discounts::find()
        .order_by_desc(Column::StartDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(discount_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Discounts",
        DiscountList { items },
        None,
    ))
}

pub async fn get_discount(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<DiscountWithProducts>> {
    let discount = Discounts::find_by_id(id).one(&state.orm).await?;
    let discount = match discount {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    let products = Products::find()
        .filter(
            ProductCol::Id.in_subquery(
                SeaQuery::select()
                    .column(DiscountProductCol::ProductId)
                    .from(DiscountProducts)
                    .and_where(Expr::col(DiscountProductCol::DiscountId).eq(id))
                    .to_owned(),
            ),
        )
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Discount",
        DiscountWithProducts {
            discount: discount_from_entity(discount),
            products,
        },
        None,
    ))
}

pub async fn create_discount(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDiscountRequest,
) -> AppResult<ApiResponse<Discount>> {
    ensure_admin(user)?;
    validate_percent(payload.percent)?;
    if payload.end_date < payload.start_date {
        return Err(AppError::Validation(
            "end_date must not precede start_date".into(),
        ));
    }
    ensure_products_exist(state, &payload.product_ids).await?;

    let txn = state.orm.begin().await?;

    let id = Uuid::new_v4();
    let discount = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        percent: Set(payload.percent),
        active: Set(payload.active),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
    }
    .insert(&txn)
    .await?;

    for product_id in payload.product_ids {
        DiscountProductActive {
            discount_id: Set(id),
            product_id: Set(product_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "discount_create",
        Some("discounts"),
        Some(serde_json::json!({ "discount_id": discount.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Discount created",
        discount_from_entity(discount),
        Some(Meta::empty()),
    ))
}

pub async fn update_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDiscountRequest,
) -> AppResult<ApiResponse<Discount>> {
    ensure_admin(user)?;
    let existing = Discounts::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    if let Some(product_ids) = payload.product_ids.as_ref() {
        ensure_products_exist(state, product_ids).await?;
    }

    let txn = state.orm.begin().await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(percent) = payload.percent {
        validate_percent(percent)?;
        active.percent = Set(percent);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date.into());
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(end_date.into());
    }
    let discount = active.update(&txn).await?;

    // A supplied product set replaces the previous one entirely.
    if let Some(product_ids) = payload.product_ids {
        DiscountProducts::delete_many()
            .filter(DiscountProductCol::DiscountId.eq(id))
            .exec(&txn)
            .await?;
        for product_id in product_ids {
            DiscountProductActive {
                discount_id: Set(id),
                product_id: Set(product_id),
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "discount_update",
        Some("discounts"),
        Some(serde_json::json!({ "discount_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        discount_from_entity(discount),
        Some(Meta::empty()),
    ))
}

pub async fn delete_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Discounts::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "discount_delete",
        Some("discounts"),
        Some(serde_json::json!({ "discount_id": id })),
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

/// Admin listing with the schedule label and per-discount product counts.
/// The label looks at the validity window only; the active flag is a
/// separate gate that only pricing honors.
pub async fn admin_status_list(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DiscountStatusList>> {
    ensure_admin(user)?;
    let now = Utc::now();
    let discounts = Discounts::find()
        .order_by_desc(Column::StartDate)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(discounts.len());
    for model in discounts {
        let (product_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM discount_products WHERE discount_id = $1")
                .bind(model.id)
                .fetch_one(&state.pool)
                .await?;

        let (available_products,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM discount_products dp
            JOIN products p ON p.id = dp.product_id
            WHERE dp.discount_id = $1 AND p.stock > 0
            "#,
        )
        .bind(model.id)
        .fetch_one(&state.pool)
        .await?;

        let discount = discount_from_entity(model);
        let status = schedule_status(discount.start_date, discount.end_date, now);
        let duration_days = (discount.end_date - discount.start_date).num_days();
        items.push(DiscountStatusRow {
            status,
            status_label: status.label_ru().to_string(),
            duration_days,
            product_count,
            available_products,
            discount,
        });
    }

    Ok(ApiResponse::success(
        "Discounts",
        DiscountStatusList { items },
        None,
    ))
}

async fn ensure_products_exist(state: &AppState, product_ids: &[Uuid]) -> AppResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let found = Products::find()
        .filter(ProductCol::Id.is_in(product_ids.iter().copied()))
        .count(&state.orm)
        .await?;
    if found as usize != product_ids.len() {
        return Err(AppError::BadRequest("some products do not exist".into()));
    }
    Ok(())
}

fn validate_percent(percent: i32) -> AppResult<()> {
    if !(0..=100).contains(&percent) {
        return Err(AppError::Validation(format!(
            "percent must be between 0 and 100, got {percent}"
        )));
    }
    Ok(())
}

pub fn discount_from_entity(model: DiscountModel) -> Discount {
    Discount {
        id: model.id,
        name: model.name,
        percent: model.percent,
        active: model.active,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.with_timezone(&Utc),
    }
}
