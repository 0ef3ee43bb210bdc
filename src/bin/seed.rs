use rust_decimal::Decimal;
use storefront_api::{
    catalog::CatalogSource,
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::ADMIN_ROLE,
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin12345", ADMIN_ROLE).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user12345", "user").await?;

    seed_catalog(
        &pool,
        CatalogSource::Products,
        &[
            ("Linen Shirt", "Breathable summer shirt", Decimal::new(2499, 2)),
            ("Canvas Tote", "Everyday carry bag", Decimal::new(1250, 2)),
            ("Leather Belt", "Full-grain, brass buckle", Decimal::new(3000, 2)),
        ],
    )
    .await?;
    seed_catalog(
        &pool,
        CatalogSource::Electronics,
        &[
            ("Wireless Earbuds", "Bluetooth 5.3, 24h battery", Decimal::new(7999, 2)),
            ("USB-C Charger", "65W GaN wall charger", Decimal::new(3450, 2)),
            ("Mechanical Keyboard", "Hot-swappable, tenkeyless", Decimal::new(11900, 2)),
        ],
    )
    .await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
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
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(
    pool: &sqlx::PgPool,
    source: CatalogSource,
    items: &[(&str, &str, Decimal)],
) -> anyhow::Result<()> {
    let table = source.table_name();
    for &(name, description, price) in items {
        let exists: Option<(Uuid,)> =
            sqlx::query_as(&format!("SELECT id FROM {table} WHERE name = $1"))
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(&format!(
            "INSERT INTO {table} (id, name, description, price) VALUES ($1, $2, $3, $4)"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded {source}");
    Ok(())
}
