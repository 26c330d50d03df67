//! Invoice documents for orders.
//!
//! An invoice section is built from an order's frozen fields and its line
//! items, then one or more sections are rendered into a single PDF. The
//! layout mirrors the printed form the shop has always used: a header, a
//! five-column table, and two summary rows pulled from the order's persisted
//! totals.
//!
//! Known quirk, kept on purpose: the per-row "Сумма" column is the gross
//! `price × quantity`, while the "Со скидкой" summary row is the discounted
//! total. The renderer logs a warning instead of unifying the two.

use std::path::Path;

use chrono::{DateTime, Utc};
use genpdf::{Alignment, Document, Element, SimplePageDecorator, elements, fonts, style};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Order, OrderStatus};
use crate::pricing::round_money;

/// Errors that can occur while building or rendering an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// The DejaVuSans family could not be loaded from the configured
    /// font directory.
    #[error("invoice fonts not found in {dir}")]
    Fonts {
        dir: String,
        #[source]
        source: genpdf::error::Error,
    },

    /// Document layout or rendering failed.
    #[error("failed to render invoice document")]
    Render(#[from] genpdf::error::Error),

    /// The order carries a status string the invoice cannot label.
    #[error("unknown order status {0:?}")]
    UnknownStatus(String),
}

/// One table row: a line item as it appears on the printed invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRow {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percent: Option<i32>,
    /// Gross `unit_price × quantity`; discounts do not reduce this column.
    pub amount: Decimal,
}

/// Line item input resolved by the caller (product names are not stored on
/// order lines).
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_percent: Option<i32>,
}

/// Everything needed to print one order.
#[derive(Debug, Clone)]
pub struct InvoiceSection {
    pub order_id: Uuid,
    pub customer: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub rows: Vec<InvoiceRow>,
    pub total_price: Decimal,
    pub discounted_total: Decimal,
}

/// Build the printable section for one order from its frozen fields.
///
/// Totals come from the order record, not from the rows: they were computed
/// once at finalize time and are never recomputed here.
pub fn build_section(
    order: &Order,
    customer: &str,
    lines: Vec<InvoiceLine>,
) -> Result<InvoiceSection, InvoiceError> {
    let status = OrderStatus::parse(&order.status)
        .ok_or_else(|| InvoiceError::UnknownStatus(order.status.clone()))?;

    let rows: Vec<InvoiceRow> = lines
        .into_iter()
        .map(|line| InvoiceRow {
            amount: round_money(line.price * Decimal::from(line.quantity)),
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.price,
            discount_percent: line.discount_percent,
        })
        .collect();

    if rows.iter().any(|row| row.discount_percent.is_some()) {
        tracing::warn!(
            order_id = %order.id,
            "invoice row amounts are gross; the discount only shows in the summary rows"
        );
    }

    Ok(InvoiceSection {
        order_id: order.id,
        customer: customer.to_string(),
        created_at: order.created_at,
        status,
        rows,
        total_price: order.total_price,
        discounted_total: order.discounted_total,
    })
}

fn money(value: Decimal) -> String {
    format!("{value:.2} руб.")
}

fn cell(text: impl Into<String>) -> elements::Paragraph {
    elements::Paragraph::new(text.into())
}

fn money_cell(value: Decimal) -> elements::Paragraph {
    elements::Paragraph::new(money(value)).aligned(Alignment::Right)
}

/// Render one section per order into a single PDF document. Page breaks are
/// inserted automatically when a section runs out of vertical space.
pub fn render_pdf(sections: &[InvoiceSection], font_dir: &Path) -> Result<Vec<u8>, InvoiceError> {
    let font_family =
        fonts::from_files(font_dir, "DejaVuSans", None).map_err(|source| InvoiceError::Fonts {
            dir: font_dir.display().to_string(),
            source,
        })?;

    let mut doc = Document::new(font_family);
    doc.set_title("orders");
    doc.set_font_size(10);
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    for (index, section) in sections.iter().enumerate() {
        doc.push(
            elements::Paragraph::new(format!("Заказ #{}", section.order_id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Break::new(0.5));
        doc.push(cell(format!("Клиент: {}", section.customer)));
        doc.push(cell(format!(
            "Дата: {}",
            section.created_at.format("%d.%m.%Y %H:%M")
        )));
        doc.push(cell(format!("Статус: {}", section.status.label_ru())));
        doc.push(elements::Break::new(1.0));

        let mut table = elements::TableLayout::new(vec![4, 1, 2, 1, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(false, false, false));

        let mut header = table.row();
        for title in ["Товар", "Кол-во", "Цена", "Скидка", "Сумма"] {
            header.push_element(cell(title).styled(style::Effect::Bold));
        }
        header.push()?;

        for row in &section.rows {
            let mut body = table.row();
            body.push_element(cell(row.product_name.clone()));
            body.push_element(cell(row.quantity.to_string()));
            body.push_element(money_cell(row.unit_price));
            body.push_element(cell(match row.discount_percent {
                Some(percent) => format!("{percent}%"),
                None => "-".to_string(),
            }));
            body.push_element(money_cell(row.amount));
            body.push()?;
        }

        let mut total = table.row();
        total.push_element(cell("ИТОГО:").styled(style::Effect::Bold));
        total.push_element(cell(""));
        total.push_element(cell(""));
        total.push_element(cell(""));
        total.push_element(money_cell(section.total_price).styled(style::Effect::Bold));
        total.push()?;

        let mut discounted = table.row();
        discounted.push_element(cell("Со скидкой:").styled(style::Effect::Bold));
        discounted.push_element(cell(""));
        discounted.push_element(cell(""));
        discounted.push_element(cell(""));
        discounted.push_element(money_cell(section.discounted_total).styled(style::Effect::Bold));
        discounted.push()?;

        doc.push(table);

        if index + 1 < sections.len() {
            doc.push(elements::Break::new(2.0));
        }
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes)?;
    Ok(bytes)
}
