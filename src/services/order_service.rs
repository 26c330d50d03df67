use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::dto::orders::{OrderDto, OrderLineInput, OrderList, OrderWithItems, PayOrderRequest, PaymentReceipt};
use crate::{
    audit::log_audit,
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        discount_products::Entity as DiscountProducts,
        discounts::Entity as Discounts,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, Payment, PaymentMethod},
    pricing::{discount_is_active, order_totals, price_line},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Freeze a set of line inputs into a persisted order.
///
/// For every line the unit price is resolved (explicit override, else the
/// product's current price), an attached discount is validated against the
/// product's discount set, and both totals accumulate with per-line
/// rounding. Everything happens on the caller's transaction: one bad line
/// aborts the whole order, no lines are left behind.
pub async fn finalize_order(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    lines: &[OrderLineInput],
) -> Result<(OrderModel, Vec<OrderItemModel>), AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Order has no lines".into()));
    }

    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::BadRequest(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = Products::find_by_id(line.product_id)
            .lock(LockType::Update)
            .one(txn)
            .await?;
        let product = match product {
            Some(p) => p,
            None => return Err(AppError::NotFound),
        };

        if product.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.id
            )));
        }

        let percent = match line.discount_id {
            Some(discount_id) => {
                let discount = Discounts::find_by_id(discount_id).one(txn).await?;
                let discount = match discount {
                    Some(d) => d,
                    None => return Err(AppError::NotFound),
                };
                let member = DiscountProducts::find_by_id((discount_id, product.id))
                    .one(txn)
                    .await?;
                if member.is_none() {
                    return Err(AppError::Validation(format!(
                        "discount {:?} cannot be applied to product {:?}",
                        discount.name, product.name
                    )));
                }
                // Pricing honors both gates, flag and window; only the admin
                // schedule label looks at the dates alone.
                if !discount_is_active(
                    discount.active,
                    discount.start_date.with_timezone(&Utc),
                    discount.end_date.with_timezone(&Utc),
                    Utc::now(),
                ) {
                    return Err(AppError::Validation(format!(
                        "discount {:?} is not currently active",
                        discount.name
                    )));
                }
                Some(discount.percent)
            }
            None => None,
        };

        let unit_price = line.price.unwrap_or(product.price);
        if unit_price < Decimal::ZERO {
            return Err(AppError::Validation("price must not be negative".into()));
        }

        priced.push((line, price_line(unit_price, line.quantity, percent)));

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(txn)
            .await?;
    }

    let totals = order_totals(priced.iter().map(|(_, p)| p));

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(OrderStatus::Pending.as_str().into()),
        total_price: Set(totals.total_price),
        discounted_total: Set(totals.discounted_total),
        invoice_path: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(priced.len());
    for (line, priced_line) in priced {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            discount_id: Set(line.discount_id),
            price: Set(priced_line.unit_price),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;
        items.push(item);
    }

    Ok((order, items))
}

/// Convert the caller's cart into an order. Cart lines carry no discounts;
/// their prices freeze at checkout time. The cart is emptied in the same
/// transaction.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?;
    let cart = match cart {
        Some(c) => c,
        None => return Err(AppError::BadRequest("Cart is empty".into())),
    };

    let cart_items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart_items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let lines: Vec<OrderLineInput> = cart_items
        .iter()
        .map(|item| OrderLineInput {
            product_id: item.product_id,
            quantity: item.quantity,
            discount_id: None,
            price: None,
        })
        .collect();

    let (order, items) = finalize_order(&txn, user.user_id, &lines).await?;

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let order = order_from_entity(order);
    let can_cancel = can_cancel(&order, user);
    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            items: items.into_iter().map(order_item_from_entity).collect(),
            can_cancel,
            order,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| {
            let order = order_from_entity(model);
            OrderDto {
                can_cancel: can_cancel(&order, user),
                order,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    let order = order_from_entity(order);
    let can_cancel = can_cancel(&order, user);
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            items,
            can_cancel,
            order,
        },
        Some(Meta::empty()),
    ))
}

/// Record a payment against an order. A missing transaction id is
/// generated; a second completed payment is rejected.
pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<PaymentReceipt>> {
    let method = PaymentMethod::parse(&payload.payment_method).ok_or_else(|| {
        AppError::BadRequest(format!(
            "unknown payment method {:?}",
            payload.payment_method
        ))
    })?;

    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let paid = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::OrderId.eq(order.id))
                .add(PaymentCol::Status.eq("completed")),
        )
        .count(&txn)
        .await?;
    if paid > 0 {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let transaction_id = payload
        .transaction_id
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method: Set(method.as_str().into()),
        status: Set("completed".into()),
        transaction_id: Set(transaction_id),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_paid",
        Some("payments"),
        Some(serde_json::json!({ "order_id": order.id, "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        PaymentReceipt {
            order: order_from_entity(order),
            payment: payment_from_entity(payment),
        },
        Some(Meta::empty()),
    ))
}

pub fn can_cancel(order: &Order, user: &AuthUser) -> bool {
    order.user_id == user.user_id && order.status == OrderStatus::Pending.as_str()
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        status: model.status,
        total_price: model.total_price,
        discounted_total: model.discounted_total,
        invoice_path: model.invoice_path,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        discount_id: model.discount_id,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        order_id: model.order_id,
        payment_method: model.payment_method,
        status: model.status,
        transaction_id: model.transaction_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
