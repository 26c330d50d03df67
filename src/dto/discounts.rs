use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Discount, Product};
use crate::pricing::ScheduleStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDiscountRequest {
    pub name: String,
    pub percent: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub product_ids: Vec<Uuid>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDiscountRequest {
    pub name: Option<String>,
    pub percent: Option<i32>,
    pub active: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub product_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DiscountList {
    #[schema(value_type = Vec<Discount>)]
    pub items: Vec<Discount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountWithProducts {
    pub discount: Discount,
    pub products: Vec<Product>,
}

/// Row of the admin discount listing. `status` is the schedule position
/// (dates only); a deactivated discount inside its window still reads
/// "Активна" here even though pricing will not apply it.
#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountStatusRow {
    pub discount: Discount,
    pub status: ScheduleStatus,
    pub status_label: String,
    pub duration_days: i64,
    pub product_count: i64,
    pub available_products: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DiscountStatusList {
    #[schema(value_type = Vec<DiscountStatusRow>)]
    pub items: Vec<DiscountStatusRow>,
}
