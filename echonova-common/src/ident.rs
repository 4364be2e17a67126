//! Identifier normalization
//!
//! Every document identifier is canonically a 16-byte value exposed as a
//! [`Uuid`]. Records written before the current schema carry the same logical
//! identifier in other shapes:
//!
//! - a 12-byte content-derived identifier stored as binary,
//! - the same 12 bytes as a 24-character hex string,
//! - an arbitrary opaque string (e.g. `"829"`),
//! - a canonical identifier string.
//!
//! [`normalize`] maps all of them onto the canonical value. The mapping is a
//! pure function: the same input always yields the same identifier, which is
//! what lets collections that store an identifier differently join on it.
//!
//! The canonical bytes use the field-flipped layout of [`Uuid::from_bytes_le`],
//! so the textual form of a legacy identifier matches what clients were
//! already given for it.

use md5::{Digest, Md5};
use thiserror::Error;
use uuid::Uuid;

/// Byte length of a legacy content-derived identifier
pub const LEGACY_ID_LEN: usize = 12;

/// Hex length of a legacy content-derived identifier
pub const LEGACY_HEX_LEN: usize = LEGACY_ID_LEN * 2;

/// Raw identifier as read from the store, before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawId<'a> {
    Binary(&'a [u8]),
    Text(&'a str),
    Integer(i64),
}

/// Identifier decode failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    /// Binary identifier too short to hold a legacy identifier
    #[error("binary identifier has {0} bytes, expected at least {LEGACY_ID_LEN}")]
    BinaryLength(usize),
}

/// Normalize a raw identifier of unknown sub-type into canonical form
pub fn normalize(raw: RawId<'_>) -> Result<Uuid, IdentError> {
    match raw {
        RawId::Binary(bytes) => normalize_binary(bytes),
        RawId::Text(text) => Ok(normalize_text(text)),
        RawId::Integer(n) => Ok(normalize_text(&n.to_string())),
    }
}

/// Normalize a binary legacy identifier
///
/// The first 12 bytes are kept, the remaining 4 canonical bytes are zero.
pub fn normalize_binary(bytes: &[u8]) -> Result<Uuid, IdentError> {
    if bytes.len() < LEGACY_ID_LEN {
        return Err(IdentError::BinaryLength(bytes.len()));
    }
    let mut canonical = [0u8; 16];
    canonical[..LEGACY_ID_LEN].copy_from_slice(&bytes[..LEGACY_ID_LEN]);
    Ok(Uuid::from_bytes_le(canonical))
}

/// Normalize a textual identifier
///
/// Never fails: text that is neither canonical nor legacy hex is digested.
pub fn normalize_text(text: &str) -> Uuid {
    if text.is_empty() {
        return Uuid::nil();
    }
    if let Ok(id) = Uuid::parse_str(text) {
        return id;
    }
    if let Some(legacy) = decode_legacy_hex(text) {
        let mut canonical = [0u8; 16];
        canonical[..LEGACY_ID_LEN].copy_from_slice(&legacy);
        return Uuid::from_bytes_le(canonical);
    }
    let digest = Md5::digest(text.as_bytes());
    let mut canonical = [0u8; 16];
    canonical.copy_from_slice(&digest);
    Uuid::from_bytes_le(canonical)
}

fn decode_legacy_hex(text: &str) -> Option<[u8; LEGACY_ID_LEN]> {
    if text.len() != LEGACY_HEX_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; LEGACY_ID_LEN];
    hex::decode_to_slice(text, &mut out).ok()?;
    Some(out)
}

/// Encode an identifier into the store's native representation for writes
pub fn encode(id: Uuid) -> String {
    id.hyphenated().to_string()
}

/// The legacy 12-byte identifier a canonical id was derived from, if any
///
/// Only identifiers whose trailing 4 bytes are zero can have come from a
/// legacy record.
pub fn legacy_object_id(id: Uuid) -> Option<[u8; LEGACY_ID_LEN]> {
    let bytes = id.to_bytes_le();
    if bytes[LEGACY_ID_LEN..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut out = [0u8; LEGACY_ID_LEN];
    out.copy_from_slice(&bytes[..LEGACY_ID_LEN]);
    Some(out)
}

/// Native representation of an identifier in a stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredForm {
    Text(String),
    Binary(Vec<u8>),
}

/// Every native representation known to normalize to `id`
///
/// Opaque-string identifiers cannot be recovered from their digest, so callers
/// holding the original key should match on it as well.
pub fn stored_forms(id: Uuid) -> Vec<StoredForm> {
    let mut forms = vec![StoredForm::Text(encode(id))];
    let upper = id.hyphenated().to_string().to_uppercase();
    if upper != encode(id) {
        forms.push(StoredForm::Text(upper));
    }
    if let Some(legacy) = legacy_object_id(id) {
        let lower = hex::encode(legacy);
        let upper = lower.to_uppercase();
        forms.push(StoredForm::Text(lower.clone()));
        if upper != lower {
            forms.push(StoredForm::Text(upper));
        }
        forms.push(StoredForm::Binary(legacy.to_vec()));
    }
    forms
}

/// Generate a fresh random identifier for a new record
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_HEX: &str = "507f1f77bcf86cd799439011";
    const LEGACY_BYTES: [u8; 12] = [
        0x50, 0x7f, 0x1f, 0x77, 0xbc, 0xf8, 0x6c, 0xd7, 0x99, 0x43, 0x90, 0x11,
    ];

    #[test]
    fn test_hex_and_binary_normalize_identically() {
        let from_hex = normalize(RawId::Text(LEGACY_HEX)).unwrap();
        let from_bin = normalize(RawId::Binary(&LEGACY_BYTES)).unwrap();
        assert_eq!(from_hex, from_bin);
        assert_eq!(from_hex.to_string(), "771f7f50-f8bc-d76c-9943-901100000000");
    }

    #[test]
    fn test_uppercase_hex_matches_lowercase() {
        let upper = LEGACY_HEX.to_uppercase();
        assert_eq!(normalize_text(&upper), normalize_text(LEGACY_HEX));
    }

    #[test]
    fn test_canonical_text_of_legacy_id_round_trips() {
        let id = normalize_text(LEGACY_HEX);
        assert_eq!(normalize_text(&encode(id)), id);
    }

    #[test]
    fn test_binary_longer_than_legacy_keeps_first_twelve() {
        let mut long = LEGACY_BYTES.to_vec();
        long.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(
            normalize_binary(&long).unwrap(),
            normalize_binary(&LEGACY_BYTES).unwrap()
        );
    }

    #[test]
    fn test_short_binary_is_rejected() {
        assert_eq!(
            normalize(RawId::Binary(&[1, 2, 3])),
            Err(IdentError::BinaryLength(3))
        );
    }

    #[test]
    fn test_opaque_text_is_deterministic() {
        let a = normalize_text("829");
        let b = normalize_text("829");
        assert_eq!(a, b);
        assert_ne!(a, normalize_text("7762"));
        // MD5("829") = ce78d1da254c0843eb23951ae077ff5f
        assert_eq!(a.to_string(), "dad178ce-4c25-4308-eb23-951ae077ff5f");
    }

    #[test]
    fn test_integer_matches_its_decimal_text() {
        assert_eq!(
            normalize(RawId::Integer(829)).unwrap(),
            normalize_text("829")
        );
    }

    #[test]
    fn test_empty_text_is_nil() {
        assert_eq!(normalize_text(""), Uuid::nil());
    }

    #[test]
    fn test_canonical_text_parsed_directly() {
        let id = Uuid::parse_str("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        assert_eq!(normalize_text("3f2504e0-4f89-11d3-9a0c-0305e82c3301"), id);
        assert_eq!(normalize_text("3F2504E04F8911D39A0C0305E82C3301"), id);
    }

    #[test]
    fn test_twenty_four_chars_non_hex_is_opaque() {
        let text = "zzzzzzzzzzzzzzzzzzzzzzzz";
        assert!(legacy_object_id(normalize_text(text)).is_none());
    }

    #[test]
    fn test_legacy_object_id_inverts_legacy_ids() {
        let id = normalize_text(LEGACY_HEX);
        assert_eq!(legacy_object_id(id), Some(LEGACY_BYTES));
        assert!(legacy_object_id(generate()).is_none());
    }

    #[test]
    fn test_stored_forms_all_normalize_back() {
        let id = normalize_text(LEGACY_HEX);
        let forms = stored_forms(id);
        assert!(forms.contains(&StoredForm::Binary(LEGACY_BYTES.to_vec())));
        assert!(forms.contains(&StoredForm::Text(LEGACY_HEX.to_string())));
        for form in forms {
            let back = match &form {
                StoredForm::Text(t) => normalize_text(t),
                StoredForm::Binary(b) => normalize_binary(b).unwrap(),
            };
            assert_eq!(back, id, "{:?} did not normalize back", form);
        }
    }
}
