// src/db.rs

use std::time::Duration;

use sqlx::{
    SqlitePool,
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::{
    config::Config,
    error::AppError,
    models::user::ROLE_ADMIN,
    utils::hash::hash_password,
};

/// Opens a pool over the given SQLite database, creating the file if needed.
pub async fn connect(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    let options = options
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the configured admin account if no user holds that email yet.
pub async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let hashed_password = hash_password(password)?;
    let name = config.admin_name.as_deref().unwrap_or("Admin User");

    sqlx::query("INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4)")
        .bind(name)
        .bind(&email)
        .bind(hashed_password)
        .bind(ROLE_ADMIN)
        .execute(pool)
        .await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}
