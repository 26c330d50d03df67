use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use sportshop_api::invoice::{InvoiceError, InvoiceLine, build_section, render_pdf};
use sportshop_api::models::{Order, OrderStatus};

fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

fn order(status: &str, total_price: Decimal, discounted_total: Decimal) -> Order {
    Order {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        status: status.to_string(),
        total_price,
        discounted_total,
        invoice_path: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn section_rows_use_gross_amounts_while_summary_uses_frozen_totals() {
    let order = order("pending", dec("2000.00"), dec("1800.00"));
    let lines = vec![InvoiceLine {
        product_name: "Кроссовки".to_string(),
        quantity: 2,
        price: dec("1000.00"),
        discount_percent: Some(10),
    }];

    let section = build_section(&order, "user@example.com", lines).expect("section");

    // The row amount is price * quantity with the discount ignored; only
    // the summary picks up the discounted total.
    assert_eq!(section.rows.len(), 1);
    assert_eq!(section.rows[0].amount, dec("2000.00"));
    assert_eq!(section.rows[0].unit_price, dec("1000.00"));
    assert_eq!(section.rows[0].discount_percent, Some(10));
    assert_eq!(section.total_price, dec("2000.00"));
    assert_eq!(section.discounted_total, dec("1800.00"));
    assert_eq!(section.status, OrderStatus::Pending);
    assert_eq!(section.status.label_ru(), "В обработке");
    assert_eq!(section.customer, "user@example.com");
}

#[test]
fn section_without_discounts_has_dash_worthy_rows() {
    let order = order("delivered", dec("250.50"), dec("250.50"));
    let lines = vec![InvoiceLine {
        product_name: "Футболка".to_string(),
        quantity: 1,
        price: dec("250.50"),
        discount_percent: None,
    }];

    let section = build_section(&order, "user@example.com", lines).expect("section");
    assert_eq!(section.rows[0].discount_percent, None);
    assert_eq!(section.rows[0].amount, dec("250.50"));
    assert_eq!(section.status.label_ru(), "Доставлен");
}

#[test]
fn unknown_status_is_rejected() {
    let order = order("cancelled", dec("1.00"), dec("1.00"));
    let result = build_section(&order, "user@example.com", Vec::new());
    assert!(matches!(result, Err(InvoiceError::UnknownStatus(_))));
}

fn font_dir() -> Option<PathBuf> {
    let dir = std::env::var("INVOICE_FONT_DIR").unwrap_or_else(|_| "./fonts".to_string());
    let dir = PathBuf::from(dir);
    if dir.join("DejaVuSans-Regular.ttf").is_file() {
        Some(dir)
    } else {
        None
    }
}

// Rendering needs the DejaVuSans family on disk; skip gracefully when the
// font directory is not set up, the same way the DB tests skip without a
// database.
#[test]
fn render_pdf_concatenates_one_section_per_order() {
    let Some(dir) = font_dir() else {
        eprintln!("Skipping test: put the DejaVuSans TTF family into INVOICE_FONT_DIR to render PDFs.");
        return;
    };

    let first = build_section(
        &order("pending", dec("2000.00"), dec("1800.00")),
        "user@example.com",
        vec![InvoiceLine {
            product_name: "Кроссовки".to_string(),
            quantity: 2,
            price: dec("1000.00"),
            discount_percent: Some(10),
        }],
    )
    .expect("first section");

    let second = build_section(
        &order("shipped", dec("250.50"), dec("250.50")),
        "other@example.com",
        vec![InvoiceLine {
            product_name: "Футболка".to_string(),
            quantity: 1,
            price: dec("250.50"),
            discount_percent: None,
        }],
    )
    .expect("second section");

    let bytes = render_pdf(&[first, second], &dir).expect("pdf bytes");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.len() > 1024);
}

#[test]
fn render_pdf_without_fonts_reports_the_directory() {
    let missing = Path::new("./definitely-missing-fonts");
    if missing.exists() {
        return;
    }
    let section = build_section(
        &order("pending", dec("1.00"), dec("1.00")),
        "user@example.com",
        Vec::new(),
    )
    .expect("section");
    let result = render_pdf(&[section], missing);
    assert!(matches!(result, Err(InvoiceError::Fonts { .. })));
}
