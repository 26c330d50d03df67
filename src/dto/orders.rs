use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, Payment};

/// One line of an order being finalized. The unit price freezes at finalize
/// time: either the explicit override or the product's current price.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub discount_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub payment_method: String,
    /// Generated when absent.
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDto {
    pub order: Order,
    /// Only the owner of a still-pending order may cancel it.
    pub can_cancel: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Only the owner of a still-pending order may cancel it.
    pub can_cancel: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<OrderDto>)]
    pub items: Vec<OrderDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub order: Order,
    pub payment: Payment,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportOrdersRequest {
    pub order_ids: Vec<Uuid>,
}
