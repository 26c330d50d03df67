use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sportshop_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", "user").await?;

    let category_id = ensure_named(&pool, "categories", "Running").await?;
    let brand_id = ensure_named(&pool, "brands", "Nike").await?;

    let product_ids = seed_products(&pool, category_id, brand_id).await?;
    seed_discount(&pool, &product_ids).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_named(pool: &sqlx::PgPool, table: &str, name: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as(&format!("SELECT id FROM {table} WHERE name = $1"))
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let row: (Uuid,) = sqlx::query_as(&format!(
        "INSERT INTO {table} (id, name) VALUES ($1, $2) RETURNING id"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;

    println!("Ensured {table} entry {name}");
    Ok(row.0)
}

async fn seed_products(
    pool: &sqlx::PgPool,
    category_id: Uuid,
    brand_id: Uuid,
) -> anyhow::Result<Vec<Uuid>> {
    let products = vec![
        ("Кроссовки Air Zoom", "Running shoes with zoom cushioning", Decimal::new(100000, 2), 50, "L"),
        ("Футболка Dri-FIT", "Breathable training tee", Decimal::new(25050, 2), 100, "M"),
        ("Шорты Flex", "Lightweight running shorts", Decimal::new(19990, 2), 75, "S"),
    ];

    let mut ids = Vec::with_capacity(products.len());
    for (name, desc, price, stock, size) in products {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if let Some((id,)) = existing {
            ids.push(id);
            continue;
        }

        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description, price, stock, category_id, brand_id, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(category_id)
        .bind(brand_id)
        .bind(size)
        .fetch_one(pool)
        .await?;
        ids.push(row.0);
    }

    println!("Seeded products");
    Ok(ids)
}

async fn seed_discount(pool: &sqlx::PgPool, product_ids: &[Uuid]) -> anyhow::Result<()> {
    let name = "Summer Sale";
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM discounts WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let discount_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO discounts (id, name, percent, active, start_date, end_date)
        VALUES ($1, $2, $3, TRUE, $4, $5)
        "#,
    )
    .bind(discount_id)
    .bind(name)
    .bind(10)
    .bind(Utc::now() - Duration::days(1))
    .bind(Utc::now() + Duration::days(30))
    .execute(pool)
    .await?;

    for product_id in product_ids {
        sqlx::query("INSERT INTO discount_products (discount_id, product_id) VALUES ($1, $2)")
            .bind(discount_id)
            .bind(product_id)
            .execute(pool)
            .await?;
    }

    println!("Seeded discount {name}");
    Ok(())
}
