//! Money math for carts and orders.
//!
//! Everything here is pure: the services resolve records from the store and
//! feed plain values in. All arithmetic is done on [`Decimal`] and rounded to
//! two fractional digits, never on binary floats, so totals accumulate the
//! same way no matter how many lines an order has.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Round a monetary value to two fractional digits.
///
/// `round_dp` is banker's rounding, which matches how the previous
/// generation of this shop formatted its decimals.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Whether a discount applies right now.
///
/// Both gates must hold: the flag must be set and `now` must fall inside
/// the validity window. The schedule label shown in admin listings uses
/// [`schedule_status`], which looks at the dates only.
pub fn discount_is_active(
    active: bool,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    active && start_date <= now && now <= end_date
}

/// Schedule position of a discount relative to `now`, ignoring the active
/// flag. This is the label the admin listing shows; it deliberately
/// disagrees with [`discount_is_active`] for deactivated discounts whose
/// window is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Planned,
    Active,
    Finished,
}

impl ScheduleStatus {
    pub fn label_ru(&self) -> &'static str {
        match self {
            ScheduleStatus::Planned => "Запланирована",
            ScheduleStatus::Active => "Активна",
            ScheduleStatus::Finished => "Завершена",
        }
    }
}

pub fn schedule_status(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ScheduleStatus {
    if start_date > now {
        ScheduleStatus::Planned
    } else if end_date < now {
        ScheduleStatus::Finished
    } else {
        ScheduleStatus::Active
    }
}

/// Apply a percent discount to a unit price: `price * (1 - percent/100)`,
/// rounded to two digits. Applying it twice discounts twice; callers only
/// invoke it once per line.
pub fn apply_discount(price: Decimal, percent: i32) -> Decimal {
    let factor = Decimal::ONE - Decimal::from(percent) / Decimal::ONE_HUNDRED;
    round_money(price * factor)
}

/// Cart quantity adjustment requested by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Plus,
    Minus,
}

/// Step a cart line quantity. `minus` refuses to go below one: the request
/// is a silent no-op, not an error. Removal is a separate operation.
pub fn step_quantity(quantity: i32, action: QuantityAction) -> i32 {
    match action {
        QuantityAction::Plus => quantity + 1,
        QuantityAction::Minus if quantity > 1 => quantity - 1,
        QuantityAction::Minus => quantity,
    }
}

/// Sum of `price * quantity` over cart lines, rounded once at the end.
/// Cart lines are never price-frozen, so this is recomputed on every read.
pub fn cart_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let sum = lines
        .into_iter()
        .map(|(price, quantity)| price * Decimal::from(quantity))
        .sum();
    round_money(sum)
}

/// Totals shown on the cart page when a discount is (optionally) selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartQuote {
    #[schema(value_type = String, example = "2250.50")]
    pub total_price: Decimal,
    #[schema(value_type = String, example = "225.05")]
    pub discount_amount: Decimal,
    #[schema(value_type = String, example = "2025.45")]
    pub final_total: Decimal,
}

/// Quote a cart total against an optionally selected discount. The discount
/// applies to the whole cart, not per line. `None` (including the lenient
/// fallback for an unknown discount id) quotes the plain total.
pub fn quote_cart(total: Decimal, percent: Option<i32>) -> CartQuote {
    let discount_amount = match percent {
        Some(percent) => round_money(total * Decimal::from(percent) / Decimal::ONE_HUNDRED),
        None => Decimal::ZERO,
    };
    CartQuote {
        total_price: total,
        discount_amount,
        final_total: total - discount_amount,
    }
}

/// One order line after pricing: the unit price frozen for the line, the
/// discounted unit price, and both line totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub final_unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub discounted_line_total: Decimal,
}

/// Price a single order line. The discount, when present, first reduces the
/// unit price (two-digit rounding), then both line totals are rounded again.
/// Rounding per line, not once over the order, keeps the persisted totals
/// bit-identical to what a line-by-line recomputation would produce.
pub fn price_line(unit_price: Decimal, quantity: i32, percent: Option<i32>) -> PricedLine {
    let final_unit_price = match percent {
        Some(percent) => apply_discount(unit_price, percent),
        None => unit_price,
    };
    let qty = Decimal::from(quantity);
    PricedLine {
        unit_price,
        final_unit_price,
        quantity,
        line_total: round_money(unit_price * qty),
        discounted_line_total: round_money(final_unit_price * qty),
    }
}

/// Frozen order totals: the gross sum and the sum after per-line discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub total_price: Decimal,
    pub discounted_total: Decimal,
}

/// Accumulate order totals over priced lines. Each line arrives already
/// rounded, so the accumulation itself introduces no further rounding.
pub fn order_totals<'a, I>(lines: I) -> OrderTotals
where
    I: IntoIterator<Item = &'a PricedLine>,
{
    let mut totals = OrderTotals::default();
    for line in lines {
        totals.total_price += line.line_total;
        totals.discounted_total += line.discounted_line_total;
    }
    totals
}
