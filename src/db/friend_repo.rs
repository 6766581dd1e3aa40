use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::{lock_conn, notification_repo, user_repo};
use crate::models::{FriendStatus, Friendship, NotificationType};
use crate::utils::{AppError, AppResult};

const FRIENDSHIP_COLUMNS: &str = "id, user_id, friend_id, status, created_at, updated_at";

pub struct FriendRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FriendRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Send a friend request and notify the recipient
    pub fn request(&self, user_id: i64, friend_id: i64) -> AppResult<i64> {
        if user_id == friend_id {
            return Err(AppError::validation("cannot befriend yourself"));
        }

        let mut conn = lock_conn(&self.conn);
        let tx = conn.transaction()?;

        let sender = user_repo::find_by_id(&tx, user_id)?
            .ok_or_else(|| AppError::validation(format!("unknown user {}", user_id)))?;
        if user_repo::find_by_id(&tx, friend_id)?.is_none() {
            return Err(AppError::validation(format!("unknown user {}", friend_id)));
        }

        if let Some(existing) = find_between(&tx, user_id, friend_id)? {
            return Err(AppError::AlreadyExists(format!(
                "friendship {} is already {}",
                existing.id, existing.status
            )));
        }

        tx.execute(
            "INSERT INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
            params![user_id, friend_id],
        )?;
        let id = tx.last_insert_rowid();

        notification_repo::create(
            &tx,
            friend_id,
            "Friend request",
            &format!("{} wants to be your friend", sender.nickname),
            NotificationType::FriendRequest,
        )?;

        tx.commit()?;
        Ok(id)
    }

    /// Accept a pending request addressed to `user_id`
    pub fn accept(&self, user_id: i64, friendship_id: i64) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE friendships SET status = 'accepted', updated_at = datetime('now')
             WHERE id = ?1 AND friend_id = ?2 AND status = 'requested'",
            params![friendship_id, user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!(
                "no pending request {} for user {}",
                friendship_id, user_id
            )));
        }

        Ok(())
    }

    /// Block `other` from `user_id`'s side, replacing any existing relation
    pub fn block(&self, user_id: i64, other: i64) -> AppResult<()> {
        if user_id == other {
            return Err(AppError::validation("cannot block yourself"));
        }

        let mut conn = lock_conn(&self.conn);
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM friendships
             WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
            params![user_id, other],
        )?;
        tx.execute(
            "INSERT INTO friendships (user_id, friend_id, status) VALUES (?1, ?2, 'blocked')",
            params![user_id, other],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Accepted friendships involving the user, in either direction
    pub fn list_friends(&self, user_id: i64) -> AppResult<Vec<Friendship>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM friendships
             WHERE (user_id = ?1 OR friend_id = ?1) AND status = 'accepted'
             ORDER BY updated_at DESC, id DESC",
            FRIENDSHIP_COLUMNS
        ))?;

        let friends = stmt
            .query_map([user_id], row_to_friendship)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(friends)
    }

    /// Requests waiting for the user's answer
    pub fn pending_requests(&self, user_id: i64) -> AppResult<Vec<Friendship>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM friendships
             WHERE friend_id = ?1 AND status = 'requested'
             ORDER BY created_at DESC, id DESC",
            FRIENDSHIP_COLUMNS
        ))?;

        let requests = stmt
            .query_map([user_id], row_to_friendship)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }
}

fn find_between(conn: &Connection, a: i64, b: i64) -> AppResult<Option<Friendship>> {
    let friendship = conn
        .query_row(
            &format!(
                "SELECT {} FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)
                 LIMIT 1",
                FRIENDSHIP_COLUMNS
            ),
            params![a, b],
            row_to_friendship,
        )
        .optional()?;

    Ok(friendship)
}

fn row_to_friendship(row: &Row) -> rusqlite::Result<Friendship> {
    let status: String = row.get(3)?;
    Ok(Friendship {
        id: row.get(0)?,
        user_id: row.get(1)?,
        friend_id: row.get(2)?,
        status: FriendStatus::from_db_str(&status),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
