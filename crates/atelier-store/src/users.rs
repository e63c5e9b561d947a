use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use crate::items::items_for_owner;
use crate::{constraint_code, StoreError, User, UserCreate};

/// Hashes a raw password for storage (SHA-256, lowercase hex).
pub fn hash_password(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Retrieves a user by ID, with their items.
pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>, StoreError> {
    conn.query_row(
        "SELECT id, email, is_active FROM users WHERE id = ?1",
        [user_id],
        map_row_to_user,
    )
    .optional()?
    .map(|user| with_items(conn, user))
    .transpose()
}

/// Retrieves a user by email address, with their items.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, StoreError> {
    conn.query_row(
        "SELECT id, email, is_active FROM users WHERE email = ?1",
        [email],
        map_row_to_user,
    )
    .optional()?
    .map(|user| with_items(conn, user))
    .transpose()
}

/// Lists users ordered by ID, skipping `skip` and returning at most `limit`.
pub fn get_users(conn: &Connection, skip: u32, limit: u32) -> Result<Vec<User>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, email, is_active FROM users ORDER BY id LIMIT ?1 OFFSET ?2")?;

    let rows = stmt.query_map(params![limit, skip], map_row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(with_items(conn, row?)?);
    }
    Ok(users)
}

/// Registers a new user. The password is hashed before it is stored.
///
/// # Errors
///
/// Returns `StoreError::DuplicateEmail` if the email is already taken, even
/// when a concurrent request registered it after the caller checked.
pub fn create_user(conn: &Connection, input: &UserCreate) -> Result<User, StoreError> {
    let hashed = hash_password(&input.password);

    if let Err(e) = conn.execute(
        "INSERT INTO users (email, hashed_password) VALUES (?1, ?2)",
        params![input.email, hashed],
    ) {
        return Err(match constraint_code(&e) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                StoreError::DuplicateEmail(input.email.clone())
            }
            _ => StoreError::Database(e),
        });
    }

    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, "user created");

    Ok(User {
        id,
        email: input.email.clone(),
        is_active: true,
        items: Vec::new(),
    })
}

fn with_items(conn: &Connection, mut user: User) -> Result<User, StoreError> {
    user.items = items_for_owner(conn, user.id)?;
    Ok(user)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        is_active: row.get(2)?,
        items: Vec::new(),
    })
}
