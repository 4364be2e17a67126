//! Identifier columns
//!
//! Identifier columns are declared with BLOB affinity, so SQLite keeps each
//! value in the storage class it was written with. Decoding dispatches on that
//! storage class and runs the value through the identifier normalizer.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::ident::{self, RawId, StoredForm};
use crate::Result;

/// Decode an optional identifier column; NULL yields `None`
pub fn decode_opt_id(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let kind = {
        let raw = row.try_get_raw(column)?;
        if raw.is_null() {
            return Ok(None);
        }
        raw.type_info().name().to_string()
    };

    let id = match kind.as_str() {
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(column)?;
            ident::normalize(RawId::Binary(&bytes))?
        }
        "INTEGER" => ident::normalize(RawId::Integer(row.try_get(column)?))?,
        "REAL" => {
            let n: f64 = row.try_get(column)?;
            ident::normalize_text(&n.to_string())
        }
        _ => {
            let text: String = row.try_get(column)?;
            ident::normalize_text(&text)
        }
    };
    Ok(Some(id))
}

/// Decode a required identifier column; NULL yields the zero identifier
pub fn decode_id(row: &SqliteRow, column: &str) -> Result<Uuid> {
    Ok(decode_opt_id(row, column)?.unwrap_or_else(Uuid::nil))
}

/// Push `(column = form OR ...)` matching every stored form of `id`
///
/// `raw_key` is the client-supplied key the id was normalized from, if any.
/// Opaque keys are only matchable through it.
pub fn push_id_match(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    id: Uuid,
    raw_key: Option<&str>,
) {
    qb.push("(");
    for (i, form) in ident::stored_forms(id).into_iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(column).push(" = ");
        match form {
            StoredForm::Text(text) => {
                qb.push_bind(text);
            }
            StoredForm::Binary(bytes) => {
                qb.push_bind(bytes);
            }
        }
    }

    if let Some(key) = raw_key.filter(|k| !k.is_empty()) {
        qb.push(" OR ").push(column).push(" = ").push_bind(key.to_string());
        // Numeric keys may have been stored as INTEGER
        if let Ok(n) = key.parse::<i64>() {
            if n.to_string() == key {
                qb.push(" OR ").push(column).push(" = ").push_bind(n);
            }
        }
    }
    qb.push(")");
}
