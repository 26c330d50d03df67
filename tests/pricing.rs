use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use sportshop_api::pricing::{
    QuantityAction, ScheduleStatus, apply_discount, cart_total, discount_is_active, order_totals,
    price_line, quote_cart, schedule_status, step_quantity,
};

fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

#[test]
fn apply_discount_takes_percent_off_and_rounds() {
    assert_eq!(apply_discount(dec("1000.00"), 10), dec("900.00"));
    assert_eq!(apply_discount(dec("250.50"), 0), dec("250.50"));
    assert_eq!(apply_discount(dec("250.50"), 100), dec("0.00"));
    // 999.99 * 0.67 = 669.9933, rounded to two digits
    assert_eq!(apply_discount(dec("999.99"), 33), dec("669.99"));
}

#[test]
fn apply_discount_again_discounts_again() {
    // One invocation, one application; a second explicit call compounds.
    let once = apply_discount(dec("1000.00"), 10);
    let twice = apply_discount(once, 10);
    assert_eq!(once, dec("900.00"));
    assert_eq!(twice, dec("810.00"));
}

#[test]
fn cart_total_is_insertion_order_independent() {
    let forward = cart_total(vec![(dec("1000.00"), 2), (dec("250.50"), 1)]);
    let backward = cart_total(vec![(dec("250.50"), 1), (dec("1000.00"), 2)]);
    assert_eq!(forward, dec("2250.50"));
    assert_eq!(backward, forward);
}

#[test]
fn cart_total_of_empty_cart_is_zero() {
    assert_eq!(cart_total(Vec::<(Decimal, i32)>::new()), Decimal::ZERO);
}

#[test]
fn quote_cart_applies_whole_cart_discount() {
    let quote = quote_cart(dec("2250.50"), Some(10));
    assert_eq!(quote.total_price, dec("2250.50"));
    assert_eq!(quote.discount_amount, dec("225.05"));
    assert_eq!(quote.final_total, dec("2025.45"));
}

#[test]
fn quote_cart_without_discount_keeps_total() {
    let quote = quote_cart(dec("2250.50"), None);
    assert_eq!(quote.discount_amount, Decimal::ZERO);
    assert_eq!(quote.final_total, dec("2250.50"));
}

#[test]
fn step_quantity_floors_at_one() {
    assert_eq!(step_quantity(1, QuantityAction::Minus), 1);
    assert_eq!(step_quantity(2, QuantityAction::Minus), 1);
    assert_eq!(step_quantity(1, QuantityAction::Plus), 2);
    assert_eq!(step_quantity(7, QuantityAction::Plus), 8);
}

#[test]
fn price_line_freezes_unit_price_and_rounds_per_line() {
    let line = price_line(dec("1000.00"), 2, Some(10));
    assert_eq!(line.unit_price, dec("1000.00"));
    assert_eq!(line.final_unit_price, dec("900.00"));
    assert_eq!(line.line_total, dec("2000.00"));
    assert_eq!(line.discounted_line_total, dec("1800.00"));

    let plain = price_line(dec("250.50"), 1, None);
    assert_eq!(plain.final_unit_price, dec("250.50"));
    assert_eq!(plain.discounted_line_total, dec("250.50"));
}

#[test]
fn order_totals_accumulate_line_by_line() {
    let lines = vec![
        price_line(dec("1000.00"), 2, Some(10)),
        price_line(dec("250.50"), 1, None),
    ];
    let totals = order_totals(lines.iter());
    assert_eq!(totals.total_price, dec("2250.50"));
    assert_eq!(totals.discounted_total, dec("2050.50"));
}

#[test]
fn order_totals_round_per_line_not_at_the_end() {
    // 0.99 at 33% is 0.6633 per unit; the per-line rounding keeps 0.66 per
    // line, so two lines sum to 1.32, not round(1.3266) = 1.33.
    let lines = vec![
        price_line(dec("0.99"), 1, Some(33)),
        price_line(dec("0.99"), 1, Some(33)),
    ];
    let totals = order_totals(lines.iter());
    assert_eq!(totals.total_price, dec("1.98"));
    assert_eq!(totals.discounted_total, dec("1.32"));
}

#[test]
fn discount_is_active_needs_flag_and_window() {
    let now = Utc::now();
    let start = now - Duration::days(1);
    let end = now + Duration::days(1);

    assert!(discount_is_active(true, start, end, now));
    assert!(!discount_is_active(false, start, end, now));
    assert!(!discount_is_active(true, now + Duration::hours(1), end, now));
    assert!(!discount_is_active(true, start, now - Duration::hours(1), now));

    // Window boundaries are inclusive.
    assert!(discount_is_active(true, now, end, now));
    assert!(discount_is_active(true, start, now, now));
}

#[test]
fn schedule_status_follows_the_window() {
    let now = Utc::now();
    assert_eq!(
        schedule_status(now + Duration::days(1), now + Duration::days(2), now),
        ScheduleStatus::Planned
    );
    assert_eq!(
        schedule_status(now - Duration::days(2), now - Duration::days(1), now),
        ScheduleStatus::Finished
    );
    assert_eq!(
        schedule_status(now - Duration::days(1), now + Duration::days(1), now),
        ScheduleStatus::Active
    );
}

#[test]
fn schedule_status_ignores_the_active_flag() {
    // A deactivated discount inside its window: the schedule label says
    // active while pricing refuses to apply it.
    let now = Utc::now();
    let start = now - Duration::days(1);
    let end = now + Duration::days(1);
    assert_eq!(schedule_status(start, end, now), ScheduleStatus::Active);
    assert!(!discount_is_active(false, start, end, now));
}
