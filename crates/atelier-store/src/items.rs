use rusqlite::{params, Connection, Row};

use crate::{constraint_code, Item, ItemCreate, StoreError};

/// Creates an item owned by `user_id`.
///
/// # Errors
///
/// Returns `StoreError::UnknownOwner` if no user has that ID.
pub fn create_user_item(
    conn: &Connection,
    item: &ItemCreate,
    user_id: i64,
) -> Result<Item, StoreError> {
    if let Err(e) = conn.execute(
        "INSERT INTO items (title, description, owner_id) VALUES (?1, ?2, ?3)",
        params![item.title, item.description, user_id],
    ) {
        return Err(match constraint_code(&e) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => StoreError::UnknownOwner(user_id),
            _ => StoreError::Database(e),
        });
    }

    let id = conn.last_insert_rowid();
    tracing::debug!(item_id = id, owner_id = user_id, "item created");

    Ok(Item {
        id,
        title: item.title.clone(),
        description: item.description.clone(),
        owner_id: user_id,
    })
}

/// Lists items ordered by ID, skipping `skip` and returning at most `limit`.
pub fn get_items(conn: &Connection, skip: u32, limit: u32) -> Result<Vec<Item>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, owner_id FROM items ORDER BY id LIMIT ?1 OFFSET ?2",
    )?;

    let rows = stmt.query_map(params![limit, skip], map_row_to_item)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub(crate) fn items_for_owner(conn: &Connection, owner_id: i64) -> Result<Vec<Item>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, owner_id FROM items WHERE owner_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map([owner_id], map_row_to_item)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn map_row_to_item(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
    })
}
