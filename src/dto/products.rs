use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Discount, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "2499.00")]
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    pub size: String,
    pub external_page: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub size: Option<String>,
    pub external_page: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Product page payload: the product plus its review aggregate.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    #[schema(value_type = Option<String>, example = "4.50")]
    pub rating_avg: Option<Decimal>,
    pub review_count: i64,
}

/// Landing payload assembled from catalog aggregates, the shape the old
/// storefront index page was built from.
#[derive(Debug, Serialize, ToSchema)]
pub struct StorefrontSummary {
    pub site_title: String,
    pub new_products: Vec<Product>,
    pub popular_products: Vec<Product>,
    pub active_discounts: Vec<Discount>,
    #[schema(value_type = Option<String>, example = "1834.17")]
    pub avg_price: Option<Decimal>,
}
