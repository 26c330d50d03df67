use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, Statement};
use uuid::Uuid;

use sportshop_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::cart::{AddCartItemRequest, CartQuery},
    dto::discounts::CreateDiscountRequest,
    dto::orders::{CreateOrderRequest, OrderLineInput, PayOrderRequest},
    dto::reviews::ReviewInput,
    entity::{
        brands::ActiveModel as BrandActive,
        categories::ActiveModel as CategoryActive,
        orders::{Column as OrderCol, Entity as Orders},
        order_items::Entity as OrderItems,
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    pricing::QuantityAction,
    routes::admin::{LowStockQuery, UpdateOrderStatusRequest},
    routes::params::Pagination,
    services::{admin_service, cart_service, discount_service, order_service, review_service},
    state::AppState,
};

fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

// Integration flow: cart accumulation -> discount quote -> checkout ->
// admin finalize with a discount -> status transitions -> payment -> reviews.
#[tokio::test]
async fn cart_checkout_finalize_and_review_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let (category_id, brand_id) = seed_catalog(&state).await?;
    let sneakers = create_product(&state, "Кроссовки", "1000.00", 10, category_id, brand_id).await?;
    let tee = create_product(&state, "Футболка", "250.50", 10, category_id, brand_id).await?;

    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Adding the same product twice increments the line to quantity 2.
    cart_service::add_item(
        &state.pool,
        &auth_user,
        AddCartItemRequest { product_id: sneakers },
    )
    .await?;
    let sneakers_item = cart_service::add_item(
        &state.pool,
        &auth_user,
        AddCartItemRequest { product_id: sneakers },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(sneakers_item.quantity, 2);

    let tee_item = cart_service::add_item(
        &state.pool,
        &auth_user,
        AddCartItemRequest { product_id: tee },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(tee_item.quantity, 1);

    // Minus at quantity 1 is a silent no-op.
    let update = cart_service::update_quantity(
        &state.pool,
        &auth_user,
        tee_item.id,
        QuantityAction::Minus,
    )
    .await?;
    assert_eq!(update.quantity, 1);
    assert_eq!(update.item_sum, dec("250.50"));
    assert_eq!(update.total, dec("2250.50"));

    // Plain totals.
    let detail = cart_service::cart_detail(
        &state.pool,
        &auth_user,
        CartQuery { discount_id: None },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(detail.quote.total_price, dec("2250.50"));
    assert_eq!(detail.quote.discount_amount, Decimal::ZERO);

    // An unknown discount id quotes without a discount instead of failing.
    let detail = cart_service::cart_detail(
        &state.pool,
        &auth_user,
        CartQuery {
            discount_id: Some(Uuid::new_v4()),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(detail.selected_discount_id.is_none());
    assert_eq!(detail.quote.final_total, dec("2250.50"));

    // A 10% discount covering the sneakers only; the cart quote applies it
    // to the whole total.
    let discount = discount_service::create_discount(
        &state,
        &auth_admin,
        CreateDiscountRequest {
            name: "Summer Sale".into(),
            percent: 10,
            active: true,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(30),
            product_ids: vec![sneakers],
        },
    )
    .await?
    .data
    .unwrap();

    let detail = cart_service::cart_detail(
        &state.pool,
        &auth_user,
        CartQuery {
            discount_id: Some(discount.id),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(detail.quote.discount_amount, dec("225.05"));
    assert_eq!(detail.quote.final_total, dec("2025.45"));

    // Checkout freezes current prices, empties the cart and reduces stock.
    let checkout = order_service::checkout(&state, &auth_user).await?.data.unwrap();
    assert_eq!(checkout.order.total_price, dec("2250.50"));
    assert_eq!(checkout.order.discounted_total, dec("2250.50"));
    assert_eq!(checkout.order.status, "pending");
    assert!(checkout.can_cancel);
    assert_eq!(checkout.items.len(), 2);

    let detail = cart_service::cart_detail(
        &state.pool,
        &auth_user,
        CartQuery { discount_id: None },
    )
    .await?
    .data
    .unwrap();
    assert!(detail.items.is_empty());

    let sneakers_row = Products::find_by_id(sneakers).one(&state.orm).await?.unwrap();
    assert_eq!(sneakers_row.stock, 8);

    // Finalize is all-or-nothing: the discount does not cover the tee, so
    // nothing of this two-line order may survive.
    let orders_before = Orders::find().count(&state.orm).await?;
    let items_before = OrderItems::find().count(&state.orm).await?;
    let result = admin_service::create_order(
        &state,
        &auth_admin,
        CreateOrderRequest {
            user_id,
            lines: vec![
                OrderLineInput {
                    product_id: sneakers,
                    quantity: 1,
                    discount_id: None,
                    price: None,
                },
                OrderLineInput {
                    product_id: tee,
                    quantity: 1,
                    discount_id: Some(discount.id),
                    price: None,
                },
            ],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(Orders::find().count(&state.orm).await?, orders_before);
    assert_eq!(OrderItems::find().count(&state.orm).await?, items_before);

    // A deactivated discount is rejected by pricing even though its window
    // is still open.
    let inactive = discount_service::create_discount(
        &state,
        &auth_admin,
        CreateDiscountRequest {
            name: "Paused Sale".into(),
            percent: 50,
            active: false,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(30),
            product_ids: vec![sneakers],
        },
    )
    .await?
    .data
    .unwrap();
    let paused = admin_service::create_order(
        &state,
        &auth_admin,
        CreateOrderRequest {
            user_id,
            lines: vec![OrderLineInput {
                product_id: sneakers,
                quantity: 1,
                discount_id: Some(inactive.id),
                price: None,
            }],
        },
    )
    .await;
    assert!(matches!(paused, Err(AppError::Validation(_))));

    // A valid finalize freezes the unit price and both totals per line.
    let created = admin_service::create_order(
        &state,
        &auth_admin,
        CreateOrderRequest {
            user_id,
            lines: vec![OrderLineInput {
                product_id: sneakers,
                quantity: 2,
                discount_id: Some(discount.id),
                price: None,
            }],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.order.total_price, dec("2000.00"));
    assert_eq!(created.order.discounted_total, dec("1800.00"));
    assert_eq!(created.items[0].price, dec("1000.00"));
    assert_eq!(created.items[0].discount_id, Some(discount.id));

    // Frozen totals do not track later price changes.
    let mut reprice: ProductActive = Products::find_by_id(sneakers)
        .one(&state.orm)
        .await?
        .unwrap()
        .into();
    reprice.price = Set(dec("1.00"));
    reprice.update(&state.orm).await?;
    let frozen = Orders::find()
        .filter(OrderCol::Id.eq(created.order.id))
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(frozen.total_price, dec("2000.00"));

    // Status only moves forward.
    let updated = admin_service::update_order_status(
        &state,
        &auth_admin,
        created.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, "shipped");

    let backwards = admin_service::update_order_status(
        &state,
        &auth_admin,
        created.order.id,
        UpdateOrderStatusRequest {
            status: "pending".into(),
        },
    )
    .await;
    assert!(backwards.is_err());

    // Payment generates a transaction id when absent; paying twice fails.
    let receipt = order_service::pay_order(
        &state,
        &auth_user,
        checkout.order.id,
        PayOrderRequest {
            payment_method: "cash".into(),
            transaction_id: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(receipt.payment.status, "completed");
    assert!(!receipt.payment.transaction_id.is_empty());

    let again = order_service::pay_order(
        &state,
        &auth_user,
        checkout.order.id,
        PayOrderRequest {
            payment_method: "card".into(),
            transaction_id: None,
        },
    )
    .await;
    assert!(again.is_err());

    // One review per (product, user).
    let first_review = review_service::add_review(
        &state,
        &auth_user,
        sneakers,
        ReviewInput {
            rating: 5,
            comment: "Отличные кроссовки".into(),
        },
    )
    .await?;
    assert!(first_review.success);

    let duplicate = review_service::add_review(
        &state,
        &auth_user,
        sneakers,
        ReviewInput {
            rating: 4,
            comment: "Ещё раз".into(),
        },
    )
    .await?;
    assert!(!duplicate.success);
    assert!(duplicate.errors.unwrap().contains_key("__all__"));

    // Low stock report includes the sneakers after the two checkouts.
    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(20),
            },
            threshold: Some(10),
        },
    )
    .await?;
    assert!(
        low.data.unwrap().items.iter().any(|p| p.id == sneakers),
        "expected sneakers to appear in the low-stock list"
    );

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, payments, cart_items, carts, discount_products, discounts, product_tags, tags, reviews, favorites, audit_logs, products, brands, categories, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        site_title: "Test Shop".to_string(),
        invoice_font_dir: "./fonts".to_string(),
    };

    Ok(AppState { pool, orm, config })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        phone: Set(None),
        email_verified: Set(false),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn seed_catalog(state: &AppState) -> anyhow::Result<(Uuid, Uuid)> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Running".into()),
    }
    .insert(&state.orm)
    .await?;

    let brand = BrandActive {
        id: Set(Uuid::new_v4()),
        name: Set("Nike".into()),
    }
    .insert(&state.orm)
    .await?;

    Ok((category.id, brand.id))
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: &str,
    stock: i32,
    category_id: Uuid,
    brand_id: Uuid,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("{name} for testing")),
        price: Set(dec(price)),
        stock: Set(stock),
        category_id: Set(category_id),
        brand_id: Set(brand_id),
        size: Set("M".into()),
        external_page: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
