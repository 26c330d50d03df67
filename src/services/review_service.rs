use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::dto::reviews::{ReviewInput, ReviewList, ReviewSubmitResponse, UpdateReviewRequest};
use crate::{
    audit::log_audit,
    entity::{
        products::Entity as Products,
        reviews::{ActiveModel, Column, Entity as Reviews, Model as ReviewModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

pub async fn list_reviews(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let items = Reviews::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

/// Submit a review. Validation failures come back in the widget body
/// (`success: false` plus field errors), not as an error response envelope.
/// One review per (product, user); a second submission is rejected.
pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: ReviewInput,
) -> AppResult<ReviewSubmitResponse> {
    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    if !RATING_RANGE.contains(&payload.rating) {
        return Ok(ReviewSubmitResponse::field_error(
            "rating",
            "rating must be between 1 and 5",
        ));
    }
    if payload.comment.trim().is_empty() {
        return Ok(ReviewSubmitResponse::field_error(
            "comment",
            "comment must not be empty",
        ));
    }

    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(Column::ProductId.eq(product_id))
                .add(Column::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Ok(ReviewSubmitResponse::field_error(
            "__all__",
            "You have already reviewed this product.",
        ));
    }

    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_create",
        Some("reviews"),
        Some(serde_json::json!({ "product_id": product_id, "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ReviewSubmitResponse::ok(review_from_entity(review)))
}

/// Edit a review. A caller who is neither the author nor an admin gets the
/// unchanged review back with a success envelope: the storefront has always
/// soft-failed here instead of erroring.
pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let review = Reviews::find_by_id(review_id).one(&state.orm).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if review.user_id != user.user_id && user.role != "admin" {
        return Ok(ApiResponse::success(
            "OK",
            review_from_entity(review),
            Some(Meta::empty()),
        ));
    }

    let mut active: ActiveModel = review.into();
    if let Some(rating) = payload.rating {
        if !RATING_RANGE.contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".into(),
            ));
        }
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        if comment.trim().is_empty() {
            return Err(AppError::Validation("comment must not be empty".into()));
        }
        active.comment = Set(comment);
    }

    let review = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_update",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

/// Delete a review; same soft-fail rule as [`update_review`] for callers
/// without permission.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(review_id).one(&state.orm).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if review.user_id == user.user_id || user.role == "admin" {
        let review_id = review.id;
        review.delete(&state.orm).await?;

        if let Err(err) = log_audit(
            &state.pool,
            Some(user.user_id),
            "review_delete",
            Some("reviews"),
            Some(serde_json::json!({ "review_id": review_id })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }

    Ok(ApiResponse::success(
        "OK",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
