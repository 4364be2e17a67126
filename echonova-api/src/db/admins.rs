//! Administrator accounts

use echonova_common::db::{decode_id, Admin};
use echonova_common::{ident, Result};
use sqlx::{Row, SqlitePool};

use super::text_column;

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Admin>> {
    let row = sqlx::query("SELECT id, email, password_hash FROM admins WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(Admin {
            id: decode_id(&r, "id")?,
            email: r.try_get("email")?,
            password_hash: text_column(&r, "password_hash")?,
        })),
        None => Ok(None),
    }
}

pub async fn exists_by_email(pool: &SqlitePool, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Admins are provisioned out of band; this is used by tooling and tests
pub async fn insert(pool: &SqlitePool, admin: &Admin) -> Result<()> {
    sqlx::query("INSERT INTO admins (id, email, password_hash) VALUES (?, ?, ?)")
        .bind(ident::encode(admin.id))
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .execute(pool)
        .await?;
    Ok(())
}
