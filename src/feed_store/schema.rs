use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use rusqlite::Connection;

/// V 0
pub(super) const POST_TABLE_V_0: Table = Table {
    name: "post",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("owner_id", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "likes_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_post_owner_id", "owner_id")],
    unique_constraints: &[],
};

pub(super) const POST_LIKE_TABLE_V_0: Table = Table {
    name: "post_like",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "post",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_post_like_post_id", "post_id")],
    unique_constraints: &[&["user_id", "post_id"]],
};

/// V 1
pub(super) const NOTIFICATION_TABLE_V_1: Table = Table {
    name: "notification",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("recipient_user_id", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
        sqlite_column!("read_at", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_notification_recipient", "recipient_user_id")],
    unique_constraints: &[],
};

pub(super) const FEED_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[POST_TABLE_V_0, POST_LIKE_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[POST_TABLE_V_0, POST_LIKE_TABLE_V_0, NOTIFICATION_TABLE_V_1],
        migration: Some(|conn: &Connection| NOTIFICATION_TABLE_V_1.create(conn)),
    },
];
