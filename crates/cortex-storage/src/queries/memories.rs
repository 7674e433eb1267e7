// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory CRUD and full-text search.

use std::sync::LazyLock;

use cortex_core::CortexError;
use cortex_core::types::{EmbeddedMemory, LexicalHit, MemoryId, MemoryRecord, NewMemory};
use regex::Regex;
use rusqlite::params;

use super::{now_timestamp, sql_limit};
use crate::database::{Database, map_tr_err};

const RECORD_COLUMNS: &str = "m.id, m.user_id, m.topic, m.fact, m.source_session, \
     m.source_channel, m.importance, m.created_at, m.last_accessed_at";

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Build an FTS5 query matching any word of `query`, each as a quoted term.
///
/// Returns `None` when the query contains no word characters.
pub fn fts_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = WORD
        .find_iter(query)
        .map(|m| format!("\"{}\"", m.as_str()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<MemoryRecord, rusqlite::Error> {
    Ok(MemoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        topic: row.get(2)?,
        fact: row.get(3)?,
        source_session: row.get(4)?,
        source_channel: row.get(5)?,
        importance: row.get(6)?,
        created_at: row.get(7)?,
        last_accessed_at: row.get(8)?,
    })
}

/// Insert a batch of memories in one transaction, sharing one creation timestamp.
pub async fn insert_memories(
    db: &Database,
    memories: &[NewMemory],
) -> Result<Vec<MemoryId>, CortexError> {
    if memories.is_empty() {
        return Ok(Vec::new());
    }
    let memories = memories.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryId>, rusqlite::Error> {
            let created_at = now_timestamp();
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(memories.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO memories (user_id, topic, fact, source_session, source_channel, importance, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for m in &memories {
                    stmt.execute(params![
                        m.user_id,
                        m.topic,
                        m.fact,
                        m.source_session,
                        m.source_channel,
                        m.importance,
                        created_at,
                    ])?;
                    ids.push(tx.last_insert_rowid());
                }
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Attach embedding bytes to a memory. Fails if the memory does not exist.
pub async fn update_embedding(
    db: &Database,
    id: MemoryId,
    embedding: Vec<u8>,
) -> Result<(), CortexError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE memories SET embedding = ?1 WHERE id = ?2",
                params![embedding, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CortexError::Storage {
            source: format!("memory {id} not found").into(),
        });
    }
    Ok(())
}

/// Full-text search ordered by bm25 rank (more negative is better).
///
/// Touches `last_accessed_at` of every returned row in the same transaction.
pub async fn search_lexical(
    db: &Database,
    query: &str,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<LexicalHit>, CortexError> {
    let Some(match_query) = fts_match_query(query) else {
        return Ok(Vec::new());
    };
    if limit == 0 {
        return Ok(Vec::new());
    }
    let user_id = user_id.map(str::to_string);
    let limit = sql_limit(limit);

    db.connection()
        .call(move |conn| -> Result<Vec<LexicalHit>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let sql = format!(
                "SELECT {RECORD_COLUMNS}, bm25(memories_fts) AS score
                 FROM memories_fts JOIN memories m ON m.id = memories_fts.rowid
                 WHERE memories_fts MATCH ?1 AND (?2 IS NULL OR m.user_id = ?2)
                 ORDER BY score LIMIT ?3"
            );
            let mut stmt = tx.prepare(&sql)?;
            let mut hits = stmt
                .query_map(params![match_query, user_id, limit], |row| {
                    Ok(LexicalHit {
                        memory: row_to_record(row)?,
                        rank: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            if !hits.is_empty() {
                let now = now_timestamp();
                let mut touch =
                    tx.prepare("UPDATE memories SET last_accessed_at = ?1 WHERE id = ?2")?;
                for hit in &mut hits {
                    touch.execute(params![now, hit.memory.id])?;
                    hit.memory.last_accessed_at = Some(now.clone());
                }
                drop(touch);
            }
            tx.commit()?;
            Ok(hits)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent memories, newest first.
pub async fn recent(
    db: &Database,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<MemoryRecord>, CortexError> {
    let user_id = user_id.map(str::to_string);
    let limit = sql_limit(limit);
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM memories m
                 WHERE (?1 IS NULL OR m.user_id = ?1)
                 ORDER BY m.created_at DESC, m.id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![user_id, limit], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Memories carrying an embedding, newest first.
pub async fn with_embeddings(
    db: &Database,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<EmbeddedMemory>, CortexError> {
    let user_id = user_id.map(str::to_string);
    let limit = sql_limit(limit);
    db.connection()
        .call(move |conn| -> Result<Vec<EmbeddedMemory>, rusqlite::Error> {
            let sql = format!(
                "SELECT {RECORD_COLUMNS}, m.embedding FROM memories m
                 WHERE m.embedding IS NOT NULL AND (?1 IS NULL OR m.user_id = ?1)
                 ORDER BY m.created_at DESC, m.id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let embedded = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(EmbeddedMemory {
                        memory: row_to_record(row)?,
                        embedding: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(embedded)
        })
        .await
        .map_err(map_tr_err)
}

/// Memories still lacking an embedding, in id order.
pub async fn without_embeddings(db: &Database) -> Result<Vec<MemoryRecord>, CortexError> {
    db.connection()
        .call(|conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM memories m WHERE m.embedding IS NULL ORDER BY m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map([], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_memory(user: Option<&str>, topic: &str, fact: &str) -> NewMemory {
        NewMemory {
            user_id: user.map(str::to_string),
            topic: topic.to_string(),
            fact: fact.to_string(),
            source_session: Some("sess-1".to_string()),
            source_channel: Some("cli".to_string()),
            importance: 5,
        }
    }

    #[test]
    fn fts_query_quotes_and_ors_words() {
        assert_eq!(
            fts_match_query("favorite color?").as_deref(),
            Some("\"favorite\" OR \"color\"")
        );
        assert_eq!(fts_match_query("  --  ").as_deref(), None);
        assert_eq!(fts_match_query("").as_deref(), None);
    }

    #[test]
    fn fts_query_neutralizes_operators() {
        let q = fts_match_query("NOT \"quoted\" AND col:value*").unwrap();
        assert_eq!(q, "\"NOT\" OR \"quoted\" OR \"AND\" OR \"col\" OR \"value\"");
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_and_shared_timestamp() {
        let db = Database::open_in_memory().await.unwrap();
        let ids = insert_memories(
            &db,
            &[
                new_memory(Some("u1"), "pets", "Has a dog named Max"),
                new_memory(Some("u1"), "food", "Likes pizza"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[1] > ids[0]);

        let rows = recent(&db, None, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, rows[1].created_at);
        assert!(rows.iter().all(|r| r.last_accessed_at.is_none()));
    }

    #[tokio::test]
    async fn insert_empty_batch_is_noop() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(insert_memories(&db, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lexical_search_ranks_and_touches() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memories(
            &db,
            &[
                new_memory(Some("u1"), "preferences", "Favorite color is blue"),
                new_memory(Some("u1"), "preferences", "Painted the fence a dark color"),
                new_memory(Some("u1"), "pets", "Has a golden retriever"),
            ],
        )
        .await
        .unwrap();

        let hits = search_lexical(&db, "favorite color", None, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].memory.fact, "Favorite color is blue");
        assert!(hits[0].rank <= hits[1].rank);
        assert!(hits.iter().all(|h| h.memory.last_accessed_at.is_some()));

        // The untouched row keeps a null access time.
        let all = recent(&db, None, 10).await.unwrap();
        let pets = all.iter().find(|r| r.topic == "pets").unwrap();
        assert!(pets.last_accessed_at.is_none());
        let touched = all.iter().filter(|r| r.last_accessed_at.is_some()).count();
        assert_eq!(touched, 2);
    }

    #[tokio::test]
    async fn lexical_search_filters_by_user_and_limit() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memories(
            &db,
            &[
                new_memory(Some("u1"), "travel", "Visited Lisbon in spring"),
                new_memory(Some("u2"), "travel", "Visited Lisbon in winter"),
                new_memory(None, "travel", "Lisbon trip planned"),
            ],
        )
        .await
        .unwrap();

        let hits = search_lexical(&db, "lisbon", Some("u2"), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.user_id.as_deref(), Some("u2"));

        let hits = search_lexical(&db, "lisbon", None, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn lexical_search_matches_stemmed_terms() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memories(&db, &[new_memory(None, "hobbies", "Enjoys running marathons")])
            .await
            .unwrap();
        let hits = search_lexical(&db, "run", None, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn lexical_search_without_words_is_empty() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memories(&db, &[new_memory(None, "x", "anything")])
            .await
            .unwrap();
        assert!(search_lexical(&db, "?!", None, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embeddings_split_records() {
        let db = Database::open_in_memory().await.unwrap();
        let ids = insert_memories(
            &db,
            &[
                new_memory(Some("u1"), "a", "first"),
                new_memory(Some("u2"), "b", "second"),
                new_memory(Some("u1"), "c", "third"),
            ],
        )
        .await
        .unwrap();

        update_embedding(&db, ids[0], vec![1, 0, 0, 0, 0, 0, 128, 63])
            .await
            .unwrap();
        update_embedding(&db, ids[1], vec![0, 0, 0, 0]).await.unwrap();

        let embedded = with_embeddings(&db, None, 500).await.unwrap();
        assert_eq!(embedded.len(), 2);
        let for_u1 = with_embeddings(&db, Some("u1"), 500).await.unwrap();
        assert_eq!(for_u1.len(), 1);
        assert_eq!(for_u1[0].memory.id, ids[0]);
        assert_eq!(for_u1[0].embedding, vec![1, 0, 0, 0, 0, 0, 128, 63]);

        let missing = without_embeddings(&db).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, ids[2]);
    }

    #[tokio::test]
    async fn update_embedding_unknown_id_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let result = update_embedding(&db, 42, vec![0, 0, 0, 0]).await;
        assert!(matches!(result, Err(CortexError::Storage { .. })));
    }

    #[tokio::test]
    async fn recent_orders_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let first = insert_memories(&db, &[new_memory(Some("u1"), "t", "older")])
            .await
            .unwrap();
        let second = insert_memories(&db, &[new_memory(Some("u1"), "t", "newer")])
            .await
            .unwrap();

        let rows = recent(&db, Some("u1"), 10).await.unwrap();
        assert_eq!(rows[0].id, second[0]);
        assert_eq!(rows[1].id, first[0]);

        let one = recent(&db, Some("u1"), 1).await.unwrap();
        assert_eq!(one.len(), 1);
        assert!(recent(&db, Some("nobody"), 10).await.unwrap().is_empty());
    }
}
