//! Document store: models, identifier columns and initialization

pub mod ids;
pub mod init;
pub mod models;

pub use ids::{decode_id, decode_opt_id, push_id_match};
pub use init::{init_database, init_memory_database};
pub use models::*;
