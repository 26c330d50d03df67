use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddCartItemRequest, CartDetail, CartItemDto, CartQuery, QuantityUpdateResponse},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    pricing::{QuantityAction, cart_total, quote_cart, round_money, step_quantity},
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: Uuid,
    brand_id: Uuid,
    size: String,
    external_page: Option<String>,
    created_at: DateTime<Utc>,
}

async fn get_or_create_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO carts (id, user_id) VALUES ($1, $2) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(id)
}

async fn cart_lines(pool: &DbPool, cart_id: Uuid) -> AppResult<Vec<CartLineRow>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.name, p.description, p.price, p.stock,
               p.category_id, p.brand_id, p.size, p.external_page, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The cart page payload. Totals always reflect current product prices; an
/// optionally selected discount is quoted over the whole cart. An unknown
/// discount id falls back to no discount instead of failing.
pub async fn cart_detail(
    pool: &DbPool,
    user: &AuthUser,
    query: CartQuery,
) -> AppResult<ApiResponse<CartDetail>> {
    let cart_id = get_or_create_cart(pool, user.user_id).await?;
    let rows = cart_lines(pool, cart_id).await?;

    let total = cart_total(rows.iter().map(|row| (row.price, row.quantity)));

    let percent = match query.discount_id {
        Some(discount_id) => {
            let found: Option<(i32,)> =
                sqlx::query_as("SELECT percent FROM discounts WHERE id = $1")
                    .bind(discount_id)
                    .fetch_optional(pool)
                    .await?;
            if found.is_none() {
                tracing::debug!(%discount_id, "unknown discount selected, quoting without it");
            }
            found.map(|(p,)| p)
        }
        None => None,
    };

    let selected_discount_id = percent.and(query.discount_id);
    let quote = quote_cart(total, percent);

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.item_id,
            item_total: round_money(row.price * Decimal::from(row.quantity)),
            quantity: row.quantity,
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                price: row.price,
                stock: row.stock,
                category_id: row.category_id,
                brand_id: row.brand_id,
                size: row.size,
                external_page: row.external_page,
                created_at: row.created_at,
            },
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CartDetail {
            cart_id,
            items,
            selected_discount_id,
            quote,
        },
        None,
    ))
}

/// Add a product to the caller's cart: a new line starts at quantity 1, an
/// existing line is incremented by 1.
pub async fn add_item(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound);
    }

    let cart_id = get_or_create_cart(pool, user.user_id).await?;

    let exist: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    let cart_item = if let Some(item) = exist {
        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = quantity + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item.id)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, 1) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(payload.product_id)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

/// Remove a line unconditionally. Only ownership is checked; the quantity
/// does not matter.
pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE id = $1
          AND cart_id IN (SELECT id FROM carts WHERE user_id = $2)
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct QuantityRow {
    cart_id: Uuid,
    quantity: i32,
    price: Decimal,
}

/// Step a line quantity and return the raw widget body
/// `{quantity, item_sum, total}`. `minus` at quantity 1 changes nothing.
pub async fn update_quantity(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    action: QuantityAction,
) -> AppResult<QuantityUpdateResponse> {
    let row: Option<QuantityRow> = sqlx::query_as(
        r#"
        SELECT ci.cart_id, ci.quantity, p.price
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let quantity = step_quantity(row.quantity, action);
    if quantity != row.quantity {
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(pool)
            .await?;
    }

    let lines: Vec<(Decimal, i32)> = sqlx::query_as(
        r#"
        SELECT p.price, ci.quantity
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        "#,
    )
    .bind(row.cart_id)
    .fetch_all(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_quantity",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id, "quantity": quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(QuantityUpdateResponse {
        quantity,
        item_sum: round_money(row.price * Decimal::from(quantity)),
        total: cart_total(lines),
    })
}
