//! User accounts

use chrono::{DateTime, Utc};
use echonova_common::db::{decode_id, push_id_match, Record, User};
use echonova_common::{ident, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, text_column};

const USER_COLUMNS: &str = "rowid, id, username, email, password_hash, preference, email_otp, \
     otp_expire, receive_recommendation_emails, profile_image_url";

fn user_from_row(row: &SqliteRow) -> Result<Record<User>> {
    Ok(Record {
        rowid: row.try_get("rowid")?,
        doc: User {
            id: decode_id(row, "id")?,
            username: text_column(row, "username")?,
            email: text_column(row, "email")?,
            password_hash: text_column(row, "password_hash")?,
            preference: json_column(row, "preference")?,
            email_otp: row.try_get("email_otp")?,
            otp_expire: row.try_get::<Option<DateTime<Utc>>, _>("otp_expire")?,
            receive_recommendation_emails: row.try_get("receive_recommendation_emails")?,
            profile_image_url: row.try_get("profile_image_url")?,
        },
    })
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Record<User>>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    row.map(|r| user_from_row(&r)).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Record<User>>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM users WHERE ", USER_COLUMNS));
    push_id_match(&mut qb, "id", id, None);
    qb.push(" LIMIT 1");

    let row = qb.build().fetch_optional(pool).await?;
    row.map(|r| user_from_row(&r)).transpose()
}

/// Insert a new user; a duplicate email fails with a UNIQUE violation
pub async fn insert(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, preference, email_otp,
                           otp_expire, receive_recommendation_emails, profile_image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ident::encode(user.id))
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(serde_json::to_string(&user.preference)?)
    .bind(&user.email_otp)
    .bind(user.otp_expire)
    .bind(user.receive_recommendation_emails)
    .bind(&user.profile_image_url)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back profile fields and OTP state of the user at `rowid`
pub async fn update(pool: &SqlitePool, rowid: i64, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, preference = ?, email_otp = ?, otp_expire = ?,
            receive_recommendation_emails = ?, profile_image_url = ?
        WHERE rowid = ?
        "#,
    )
    .bind(&user.username)
    .bind(serde_json::to_string(&user.preference)?)
    .bind(&user.email_otp)
    .bind(user.otp_expire)
    .bind(user.receive_recommendation_emails)
    .bind(&user.profile_image_url)
    .bind(rowid)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY rowid LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(|r| user_from_row(r).map(|rec| rec.doc)).collect()
}

/// Users who opted in to recommendation mail
pub async fn list_recommendation_subscribers(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE receive_recommendation_emails = 1 ORDER BY rowid",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(|r| user_from_row(r).map(|rec| rec.doc)).collect()
}
