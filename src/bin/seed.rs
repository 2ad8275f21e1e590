use croquettes_shop::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::users::{Column as UserCol, Entity as Users, UserRole},
    services::auth_service::{NewAccount, create_account, hash_password},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use sqlx::PgPool;
use uuid::Uuid;

const PRODUCTS: &[(&str, &str, i64, i32)] = &[
    ("Croquettes Chien Adulte 3kg", "Poulet et riz, pour chiens adultes", 9500, 40),
    ("Croquettes Chien Junior 3kg", "Riche en protéines, pour chiots", 10500, 25),
    ("Croquettes Chat Stérilisé 2kg", "Saumon, faible en graisses", 8000, 30),
    ("Croquettes Chat Adulte 2kg", "Boeuf et légumes", 7500, 0),
    ("Friandises Dentaires 200g", "Bâtonnets à mâcher", 2500, 100),
];

const LOCATIONS: &[(&str, &str)] = &[
    ("Plateau", "Avenue Léopold Sédar Senghor, Dakar"),
    ("Almadies", "Route des Almadies, Dakar"),
    ("Point E", "Rue de Fatick, Dakar"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_account(&orm, "admin", "admin1234", UserRole::Superuser).await?;
    let staff_id = ensure_account(&orm, "staff", "staff1234", UserRole::Staff).await?;
    let customer_id = ensure_account(&orm, "client", "client1234", UserRole::Customer).await?;

    let pool = orm.get_postgres_connection_pool();
    seed_products(pool).await?;
    seed_locations(pool).await?;

    println!(
        "Seed completed. Superuser ID: {admin_id}, Staff ID: {staff_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_account(
    orm: &OrmConn,
    username: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Username.eq(username))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let txn = orm.begin().await?;
    let user = create_account(
        &txn,
        NewAccount {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password(password)?,
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            role,
        },
    )
    .await?;
    txn.commit().await?;

    Ok(user.id)
}

async fn seed_products(pool: &PgPool) -> anyhow::Result<()> {
    for (name, description, price, stock) in PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_locations(pool: &PgPool) -> anyhow::Result<()> {
    for (name, address) in LOCATIONS {
        sqlx::query(
            r#"
            INSERT INTO delivery_locations (id, name, address, is_active)
            SELECT $1, $2, $3, TRUE
            WHERE NOT EXISTS (SELECT 1 FROM delivery_locations WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(address)
        .execute(pool)
        .await?;
    }
    Ok(())
}
