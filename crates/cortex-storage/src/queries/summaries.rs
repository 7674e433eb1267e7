// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session summaries and store-wide statistics.

use cortex_core::CortexError;
use cortex_core::types::{NewSummary, StoreStats};
use rusqlite::params;

use super::now_timestamp;
use crate::database::{Database, map_tr_err};

/// Write a session summary. Summaries are never updated.
pub async fn insert_summary(db: &Database, summary: &NewSummary) -> Result<i64, CortexError> {
    let summary = summary.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO summaries (session_id, channel, user_id, summary, message_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    summary.session_id,
                    summary.channel,
                    summary.user_id,
                    summary.summary,
                    summary.message_count,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Count memories, summaries, distinct users and distinct topics.
pub async fn stats(db: &Database) -> Result<StoreStats, CortexError> {
    db.connection()
        .call(|conn| -> Result<StoreStats, rusqlite::Error> {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM memories),
                    (SELECT COUNT(*) FROM summaries),
                    (SELECT COUNT(DISTINCT user_id) FROM memories),
                    (SELECT COUNT(DISTINCT topic) FROM memories)",
                [],
                |row| {
                    let count = |idx: usize| -> Result<u64, rusqlite::Error> {
                        Ok(u64::try_from(row.get::<_, i64>(idx)?).unwrap_or(0))
                    };
                    Ok(StoreStats {
                        total_memories: count(0)?,
                        total_summaries: count(1)?,
                        unique_users: count(2)?,
                        unique_topics: count(3)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::memories::insert_memories;
    use cortex_core::types::NewMemory;

    #[tokio::test]
    async fn stats_on_empty_store() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(stats(&db).await.unwrap(), StoreStats::default());
    }

    #[tokio::test]
    async fn stats_counts_distinct_users_and_topics() {
        let db = Database::open_in_memory().await.unwrap();
        let make = |user: Option<&str>, topic: &str| NewMemory {
            user_id: user.map(str::to_string),
            topic: topic.to_string(),
            fact: format!("fact about {topic}"),
            source_session: None,
            source_channel: None,
            importance: 5,
        };
        insert_memories(
            &db,
            &[
                make(Some("u1"), "pets"),
                make(Some("u1"), "food"),
                make(Some("u2"), "pets"),
                make(None, "work"),
            ],
        )
        .await
        .unwrap();
        insert_summary(
            &db,
            &NewSummary {
                session_id: "s1".into(),
                channel: Some("discord".into()),
                user_id: Some("u1".into()),
                summary: "Talked about pets".into(),
                message_count: 12,
            },
        )
        .await
        .unwrap();

        let s = stats(&db).await.unwrap();
        assert_eq!(s.total_memories, 4);
        assert_eq!(s.total_summaries, 1);
        assert_eq!(s.unique_users, 2);
        assert_eq!(s.unique_topics, 3);
    }
}
