use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::{InventoryItem, Placement, StoreItem};
use crate::utils::{AppError, AppResult};

const ITEM_COLUMNS: &str = "id, name, category, description, price, created_at";
const INVENTORY_COLUMNS: &str =
    "id, user_id, item_id, category, x, y, is_placed, priority, acquired_at";

/// Shop catalog and the inventories bought from it
pub struct StoreRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StoreRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn create_item(&self, item: &mut StoreItem) -> AppResult<i64> {
        item.validate()?;

        let conn = lock_conn(&self.conn);
        conn.execute(
            "INSERT INTO store_items (name, category, description, price) VALUES (?1, ?2, ?3, ?4)",
            params![item.name.trim(), item.category.trim(), item.description, item.price],
        )?;

        let id = conn.last_insert_rowid();
        item.id = Some(id);

        Ok(id)
    }

    pub fn find_item(&self, id: i64) -> AppResult<Option<StoreItem>> {
        let conn = lock_conn(&self.conn);
        find_item(&conn, id)
    }

    /// Catalog listing, optionally limited to one category
    pub fn list_items(&self, category: Option<&str>) -> AppResult<Vec<StoreItem>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM store_items
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY category, price, id",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map([category], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn inventory_for_user(&self, user_id: i64) -> AppResult<Vec<InventoryItem>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory WHERE user_id = ?1 ORDER BY acquired_at, id",
            INVENTORY_COLUMNS
        ))?;

        let items = stmt
            .query_map([user_id], row_to_inventory)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Items currently placed in a user's room, in drawing order
    pub fn placed_for_user(&self, user_id: i64) -> AppResult<Vec<InventoryItem>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory
             WHERE user_id = ?1 AND is_placed = 1
             ORDER BY priority, id",
            INVENTORY_COLUMNS
        ))?;

        let items = stmt
            .query_map([user_id], row_to_inventory)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Put an owned item into the room
    pub fn place_item(&self, user_id: i64, inventory_id: i64, placement: Placement) -> AppResult<()> {
        placement.validate()?;

        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE inventory SET x = ?1, y = ?2, priority = ?3, is_placed = 1
             WHERE id = ?4 AND user_id = ?5",
            params![placement.x, placement.y, placement.priority, inventory_id, user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!(
                "user {} does not own inventory item {}",
                user_id, inventory_id
            )));
        }

        Ok(())
    }

    /// Take an item back out of the room, coordinates are cleared
    pub fn unplace_item(&self, user_id: i64, inventory_id: i64) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE inventory SET x = NULL, y = NULL, is_placed = 0
             WHERE id = ?1 AND user_id = ?2",
            params![inventory_id, user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!(
                "user {} does not own inventory item {}",
                user_id, inventory_id
            )));
        }

        Ok(())
    }
}

pub(crate) fn find_item(conn: &Connection, id: i64) -> AppResult<Option<StoreItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM store_items WHERE id = ?1", ITEM_COLUMNS),
            [id],
            row_to_item,
        )
        .optional()?;

    Ok(item)
}

/// Record ownership; only the purchase flow calls this
pub(crate) fn insert_inventory(
    conn: &Connection,
    user_id: i64,
    item_id: i64,
    category: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO inventory (user_id, item_id, category) VALUES (?1, ?2, ?3)",
        params![user_id, item_id, category],
    )?;

    Ok(conn.last_insert_rowid())
}

fn row_to_item(row: &Row) -> rusqlite::Result<StoreItem> {
    Ok(StoreItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_inventory(row: &Row) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        category: row.get(3)?,
        x: row.get(4)?,
        y: row.get(5)?,
        is_placed: row.get(6)?,
        priority: row.get(7)?,
        acquired_at: row.get(8)?,
    })
}
