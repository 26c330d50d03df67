use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::dto::orders::{
    CreateOrderRequest, ExportOrdersRequest, OrderDto, OrderList, OrderWithItems,
};
use crate::invoice::{self, InvoiceLine};
use crate::{
    audit::log_audit,
    entity::{
        discounts::Entity as Discounts,
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::admin::{InventoryAdjustRequest, LowStockQuery, ProductList, UpdateOrderStatusRequest},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{can_cancel, finalize_order, order_from_entity, order_item_from_entity},
    services::product_service::product_from_entity,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
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
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id).one(&state.orm).await?;
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

/// Finalize an order for a customer from explicit line inputs, discounts
/// and price overrides included. All-or-nothing: one invalid line rolls the
/// whole order back.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let customer = Users::find_by_id(payload.user_id).one(&state.orm).await?;
    if customer.is_none() {
        return Err(AppError::BadRequest("user not found".into()));
    }

    let txn = state.orm.begin().await?;
    let (order, items) = finalize_order(&txn, payload.user_id, &payload.lines).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "customer_id": payload.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let order = order_from_entity(order);
    let can_cancel = can_cancel(&order, user);
    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            items: items.into_iter().map(order_item_from_entity).collect(),
            can_cancel,
            order,
        },
        Some(Meta::empty()),
    ))
}

/// Apply a status transition. The lifecycle only moves forward
/// (`pending -> shipped -> delivered`); anything else is rejected.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid status {:?}", payload.status)))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&order.status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stored status {:?}", order.status)))?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "cannot change status from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": next.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Render the selected orders into one PDF, one section per order.
pub async fn export_orders_pdf(
    state: &AppState,
    user: &AuthUser,
    payload: ExportOrdersRequest,
) -> AppResult<Vec<u8>> {
    ensure_admin(user)?;
    if payload.order_ids.is_empty() {
        return Err(AppError::BadRequest("no orders selected".into()));
    }

    let mut sections = Vec::with_capacity(payload.order_ids.len());
    for order_id in &payload.order_ids {
        let order = Orders::find_by_id(*order_id).one(&state.orm).await?;
        let order = match order {
            Some(o) => o,
            None => return Err(AppError::NotFound),
        };

        let customer = Users::find_by_id(order.user_id)
            .one(&state.orm)
            .await?
            .map(|u| u.email)
            .unwrap_or_else(|| order.user_id.to_string());

        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&state.orm)
            .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let product_names: HashMap<Uuid, String> = Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let discount_ids: Vec<Uuid> = items.iter().filter_map(|item| item.discount_id).collect();
        let discount_percents: HashMap<Uuid, i32> = if discount_ids.is_empty() {
            HashMap::new()
        } else {
            Discounts::find()
                .filter(crate::entity::discounts::Column::Id.is_in(discount_ids))
                .all(&state.orm)
                .await?
                .into_iter()
                .map(|d| (d.id, d.percent))
                .collect()
        };

        let lines = items
            .iter()
            .map(|item| InvoiceLine {
                product_name: product_names
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_else(|| item.product_id.to_string()),
                quantity: item.quantity,
                price: item.price,
                discount_percent: item
                    .discount_id
                    .and_then(|id| discount_percents.get(&id).copied()),
            })
            .collect();

        sections.push(invoice::build_section(
            &order_from_entity(order),
            &customer,
            lines,
        )?);
    }

    let bytes = invoice::render_pdf(&sections, Path::new(&state.config.invoice_font_dir))?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "orders_export",
        Some("orders"),
        Some(serde_json::json!({ "order_ids": payload.order_ids })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(bytes)
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();
    let threshold = query.threshold.unwrap_or(5);

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock);

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
    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<crate::models::Product>> {
    ensure_admin(user)?;
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let stock = product.stock + payload.delta;
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot go negative".into()));
    }

    let mut active: ProductActive = product.into();
    active.stock = Set(stock);
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({ "product_id": id, "delta": payload.delta })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Inventory updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}
