use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::info;

use crate::likes::{Like, LikeDeleteOutcome, LikeInsertOutcome, LikeStore};
use crate::notifications::{NotificationKind, NotificationStore, PendingNotification};
use crate::posts::{Post, PostStore};
use crate::sqlite_persistence::validate_and_migrate;

use super::schema::{
    FEED_VERSIONED_SCHEMAS, NOTIFICATION_TABLE_V_1, POST_LIKE_TABLE_V_0, POST_TABLE_V_0,
};

/// Posts, like facts and the notification queue in a single SQLite database.
///
/// Every store call takes the connection lock once, so each call is atomic on
/// its own and concurrent toggles interleave only between calls.
#[derive(Clone)]
pub struct SqliteFeedStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFeedStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open feed db {:?}", db_path))?
        } else {
            let conn = Connection::open(db_path)
                .with_context(|| format!("Failed to create feed db {:?}", db_path))?;
            FEED_VERSIONED_SCHEMAS
                .last()
                .context("No feed schema defined")?
                .create(&conn)?;
            info!("Created new feed db at {:?}", db_path);
            conn
        };

        // Not persisted by SQLite, has to be set on every connection.
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        validate_and_migrate(&conn, FEED_VERSIONED_SCHEMAS)?;

        Ok(SqliteFeedStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn apply_like_delta(&self, post_id: &str, delta: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET likes_count = likes_count + ?1 WHERE id = ?2",
                    POST_TABLE_V_0.name
                ),
                params![delta, post_id],
            )
            .with_context(|| format!("Failed to apply like delta {} to post {}", delta, post_id))?;
        if updated == 0 {
            bail!("Post {} not found while updating like count", post_id);
        }
        Ok(())
    }

    fn get_notification(conn: &Connection, notification_id: &str) -> Result<Option<PendingNotification>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, recipient_user_id, kind, payload, read_at, created FROM {} WHERE id = ?1",
                    NOTIFICATION_TABLE_V_1.name
                ),
                params![notification_id],
                NotificationRow::from_row,
            )
            .optional()?;
        row.map(NotificationRow::into_notification).transpose()
    }
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn post_from_row(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        content: row.get(2)?,
        likes_count: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Raw notification columns; kind and payload are decoded after the query.
struct NotificationRow {
    id: String,
    recipient_user_id: String,
    kind: String,
    payload: String,
    read_at: Option<i64>,
    created_at: i64,
}

impl NotificationRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(NotificationRow {
            id: row.get(0)?,
            recipient_user_id: row.get(1)?,
            kind: row.get(2)?,
            payload: row.get(3)?,
            read_at: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_notification(self) -> Result<PendingNotification> {
        Ok(PendingNotification {
            kind: self.kind.parse()?,
            payload: serde_json::from_str(&self.payload)
                .with_context(|| format!("Invalid payload for notification {}", self.id))?,
            id: self.id,
            recipient_user_id: self.recipient_user_id,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}

impl PostStore for SqliteFeedStore {
    fn create_post(&self, owner_id: &str, content: &str) -> Result<Post> {
        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            content: content.to_string(),
            likes_count: 0,
            created_at: now_timestamp(),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, owner_id, content, likes_count, created) VALUES (?1, ?2, ?3, 0, ?4)",
                POST_TABLE_V_0.name
            ),
            params![post.id, post.owner_id, post.content, post.created_at],
        )
        .with_context(|| format!("Failed to create post for user {}", owner_id))?;
        Ok(post)
    }

    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        let post = conn
            .query_row(
                &format!(
                    "SELECT id, owner_id, content, likes_count, created FROM {} WHERE id = ?1",
                    POST_TABLE_V_0.name
                ),
                params![post_id],
                post_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load post {}", post_id))?;
        Ok(post)
    }

    fn get_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, owner_id, content, likes_count, created FROM {} ORDER BY created DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            POST_TABLE_V_0.name
        ))?;
        let posts = stmt
            .query_map(params![limit as i64, offset as i64], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn count_posts(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", POST_TABLE_V_0.name),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count as usize)
    }

    fn increment_like_count(&self, post_id: &str) -> Result<()> {
        self.apply_like_delta(post_id, 1)
    }

    fn decrement_like_count(&self, post_id: &str) -> Result<()> {
        self.apply_like_delta(post_id, -1)
    }

    fn reconcile_like_counts(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let repaired = conn
            .execute(
                &format!(
                    "UPDATE {post} SET likes_count = \
                     (SELECT COUNT(*) FROM {like} WHERE {like}.post_id = {post}.id) \
                     WHERE likes_count != (SELECT COUNT(*) FROM {like} WHERE {like}.post_id = {post}.id)",
                    post = POST_TABLE_V_0.name,
                    like = POST_LIKE_TABLE_V_0.name
                ),
                [],
            )
            .context("Failed to reconcile like counts")?;
        Ok(repaired)
    }
}

impl LikeStore for SqliteFeedStore {
    fn like_exists(&self, user_id: &str, post_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1 AND post_id = ?2)",
                POST_LIKE_TABLE_V_0.name
            ),
            params![user_id, post_id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn insert_like(&self, user_id: &str, post_id: &str) -> Result<LikeInsertOutcome> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!(
                "INSERT INTO {} (user_id, post_id, created) VALUES (?1, ?2, ?3)",
                POST_LIKE_TABLE_V_0.name
            ),
            params![user_id, post_id, now_timestamp()],
        );
        match result {
            Ok(_) => Ok(LikeInsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(LikeInsertOutcome::AlreadyExists),
            Err(err) => Err(err).with_context(|| {
                format!("Failed to insert like of user {} on post {}", user_id, post_id)
            }),
        }
    }

    fn delete_like(&self, user_id: &str, post_id: &str) -> Result<LikeDeleteOutcome> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE user_id = ?1 AND post_id = ?2",
                    POST_LIKE_TABLE_V_0.name
                ),
                params![user_id, post_id],
            )
            .with_context(|| {
                format!("Failed to delete like of user {} on post {}", user_id, post_id)
            })?;
        Ok(if deleted == 0 {
            LikeDeleteOutcome::NotFound
        } else {
            LikeDeleteOutcome::Deleted
        })
    }

    fn count_post_likes(&self, post_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE post_id = ?1",
                POST_LIKE_TABLE_V_0.name
            ),
            params![post_id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count as usize)
    }

    fn get_post_likes(&self, post_id: &str) -> Result<Vec<Like>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id, post_id, created FROM {} WHERE post_id = ?1 ORDER BY id ASC",
            POST_LIKE_TABLE_V_0.name
        ))?;
        let likes = stmt
            .query_map(params![post_id], |row| {
                Ok(Like {
                    user_id: row.get(0)?,
                    post_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(likes)
    }
}

impl NotificationStore for SqliteFeedStore {
    fn enqueue(
        &self,
        recipient_user_id: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<PendingNotification> {
        let notification = PendingNotification {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_user_id: recipient_user_id.to_string(),
            kind,
            payload,
            read_at: None,
            created_at: now_timestamp(),
        };
        let payload = serde_json::to_string(&notification.payload)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, recipient_user_id, kind, payload, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                NOTIFICATION_TABLE_V_1.name
            ),
            params![
                notification.id,
                notification.recipient_user_id,
                notification.kind.as_str(),
                payload,
                notification.created_at
            ],
        )
        .with_context(|| format!("Failed to enqueue notification for {}", recipient_user_id))?;
        Ok(notification)
    }

    fn get_user_notifications(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PendingNotification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, recipient_user_id, kind, payload, read_at, created FROM {} \
             WHERE recipient_user_id = ?1 ORDER BY created DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            NOTIFICATION_TABLE_V_1.name
        ))?;
        let rows = stmt
            .query_map(
                params![user_id, limit as i64, offset as i64],
                NotificationRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    fn count_user_notifications(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE recipient_user_id = ?1",
                NOTIFICATION_TABLE_V_1.name
            ),
            params![user_id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count as usize)
    }

    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<PendingNotification>> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET read_at = COALESCE(read_at, ?1) WHERE id = ?2 AND recipient_user_id = ?3",
                NOTIFICATION_TABLE_V_1.name
            ),
            params![now_timestamp(), notification_id, user_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        Self::get_notification(&conn, notification_id)
    }

    fn get_unread_count(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE recipient_user_id = ?1 AND read_at IS NULL",
                NOTIFICATION_TABLE_V_1.name
            ),
            params![user_id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count as usize)
    }
}
