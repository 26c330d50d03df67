use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;
use crate::pricing::{CartQuote, QuantityAction};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub action: QuantityAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartQuery {
    /// Optional discount selection for the quote. An unknown id quotes
    /// without a discount instead of failing.
    pub discount_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    #[schema(value_type = String, example = "2000.00")]
    pub item_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartDetail {
    pub cart_id: Uuid,
    pub items: Vec<CartItemDto>,
    pub selected_discount_id: Option<Uuid>,
    pub quote: CartQuote,
}

/// Raw body returned to the storefront's quantity widget; deliberately not
/// wrapped in the [`crate::response::ApiResponse`] envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuantityUpdateResponse {
    pub quantity: i32,
    #[schema(value_type = String, example = "2000.00")]
    pub item_sum: Decimal,
    #[schema(value_type = String, example = "2250.50")]
    pub total: Decimal,
}
