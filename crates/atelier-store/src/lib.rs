//! Users and items persistence for Atelier.
//!
//! This is the mapper boundary: HTTP handlers pass in a connection obtained
//! from a request-scoped session and get plain model structs back. Nothing
//! here opens, pools, or closes connections.
//!
//! Stored password hashes never leave this crate. [`User`] carries no password
//! or hash, so serializing it for a response cannot leak one.

mod items;
mod users;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use items::{create_user_item, get_items};
pub use users::{create_user, get_user, get_user_by_email, get_users, hash_password};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
    #[error("owner not found: {0}")]
    UnknownOwner(i64),
}

/// An item owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

/// Input for creating an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A registered user, as exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    /// Items owned by this user, in creation order.
    pub items: Vec<Item>,
}

/// Input for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
}

/// Maps a SQLite constraint failure to its extended result code.
fn constraint_code(err: &rusqlite::Error) -> Option<std::os::raw::c_int> {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(e.extended_code)
        }
        _ => None,
    }
}
