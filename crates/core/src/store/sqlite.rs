//! `Store` backed by `turso`, the teacher's embedded SQLite-compatible
//! engine. Mirrors `providers::db::sqlite::SqliteProvider`: one `Database`
//! handle shared across clones, a fresh `Connection` per operation.

use super::schema;
use crate::errors::{ProcessingStatus, RagError};
use crate::store::Store;
use crate::types::{Chunk, Document, DocumentCounts, FileType, NewChunk, NewDocument, ScoredChunk};
use async_trait::async_trait;
use std::fmt::{self, Debug};
use turso::{params, Database, Value as TursoValue};

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path`. Use `:memory:` for an
    /// isolated in-memory instance, the way `SqliteProvider::new` does for
    /// tests; clone the resulting `SqliteStore` to share one in-memory
    /// database across handles.
    pub async fn new(db_path: &str) -> Result<Self, RagError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| RagError::Store(e.to_string()))?;

        let conn = db.connect().map_err(|e| RagError::Store(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| RagError::Store(e.to_string()))?;
        conn.query("PRAGMA foreign_keys=ON;", ())
            .await
            .map_err(|e| RagError::Store(e.to_string()))?;

        let store = Self { db };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Idempotent; safe to call on every boot.
    pub async fn initialize_schema(&self) -> Result<(), RagError> {
        let conn = self.connect()?;
        for statement in schema::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ())
                .await
                .map_err(|e| RagError::Store(e.to_string()))?;
        }
        // Best-effort: the ANN index needs turso's experimental_indexes
        // feature. Its absence degrades search_vector to a flat scan, it
        // never makes the boot fail.
        let _ = conn.execute(schema::OPTIONAL_VECTOR_INDEX_SQL, ()).await;
        Ok(())
    }

    fn connect(&self) -> Result<turso::Connection, RagError> {
        self.db.connect().map_err(|e| RagError::Store(e.to_string()))
    }
}

fn pack_vector(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for f in v {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

fn unpack_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn text_value(row: &turso::Row, idx: usize) -> Result<String, RagError> {
    match row.get_value(idx).map_err(|e| RagError::Store(e.to_string()))? {
        TursoValue::Text(s) => Ok(s),
        TursoValue::Null => Ok(String::new()),
        other => Ok(format!("{other:?}")),
    }
}

fn opt_text_value(row: &turso::Row, idx: usize) -> Result<Option<String>, RagError> {
    match row.get_value(idx).map_err(|e| RagError::Store(e.to_string()))? {
        TursoValue::Text(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn int_value(row: &turso::Row, idx: usize) -> Result<i64, RagError> {
    match row.get_value(idx).map_err(|e| RagError::Store(e.to_string()))? {
        TursoValue::Integer(i) => Ok(i),
        TursoValue::Null => Ok(0),
        _ => Ok(0),
    }
}

fn row_to_document(row: &turso::Row) -> Result<Document, RagError> {
    let file_type_str = text_value(row, 2)?;
    let status_str = text_value(row, 10)?;
    Ok(Document {
        id: text_value(row, 0)?,
        filename: text_value(row, 1)?,
        file_type: FileType::from_extension(&file_type_str).ok_or_else(|| {
            RagError::Store(format!("unknown file_type in row: {file_type_str}"))
        })?,
        size_bytes: int_value(row, 3)?,
        content_hash: text_value(row, 4)?,
        storage_path: text_value(row, 5)?,
        character_count: int_value(row, 6)?,
        word_count: int_value(row, 7)?,
        page_count: int_value(row, 8)?,
        chunk_count: int_value(row, 9)?,
        processing_status: ProcessingStatus::from_str(&status_str)
            .ok_or_else(|| RagError::Store(format!("unknown processing_status: {status_str}")))?,
        failure_message: opt_text_value(row, 11)?,
        created_at: text_value(row, 12)?,
        updated_at: text_value(row, 13)?,
    })
}

const DOCUMENT_COLUMNS: &str = "id, filename, file_type, size_bytes, content_hash, storage_path, \
    character_count, word_count, page_count, chunk_count, processing_status, failure_message, \
    created_at, updated_at";

fn row_to_chunk(row: &turso::Row) -> Result<Chunk, RagError> {
    let vector = match row.get_value(4).map_err(|e| RagError::Store(e.to_string()))? {
        TursoValue::Blob(bytes) => Some(unpack_vector(&bytes)),
        _ => None,
    };
    Ok(Chunk {
        id: text_value(row, 0)?,
        document_id: text_value(row, 1)?,
        chunk_index: int_value(row, 2)?,
        text: text_value(row, 3)?,
        char_length: int_value(row, 5)?,
        vector,
    })
}

const CHUNK_COLUMNS: &str = "id, document_id, chunk_index, text, embedding, char_length";

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, new: NewDocument) -> Result<Document, RagError> {
        let conn = self.connect()?;
        let now = chrono::Utc::now().to_rfc3339();

        let insert = conn
            .execute(
                &format!(
                    "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, 0, 'pending', NULL, ?, ?)"
                ),
                params![
                    new.id.clone(),
                    new.filename.clone(),
                    new.file_type.as_str().to_string(),
                    new.size_bytes,
                    new.content_hash.clone(),
                    new.storage_path.clone(),
                    now.clone(),
                    now,
                ],
            )
            .await;

        if let Err(e) = insert {
            if let Some(existing) = self.get_document_by_hash(&new.content_hash).await? {
                return Err(RagError::DuplicateContent(existing.id));
            }
            return Err(RagError::Store(e.to_string()));
        }

        self.get_document(&new.id).await
    }

    async fn get_document(&self, id: &str) -> Result<Document, RagError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_document(&row),
            None => Err(RagError::NotFound(format!("document {id}"))),
        }
    }

    async fn get_document_by_hash(&self, hash: &str) -> Result<Option<Document>, RagError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE content_hash = ?"),
                params![hash.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_documents(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<ProcessingStatus>,
    ) -> Result<Vec<Document>, RagError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents {} ORDER BY created_at ASC LIMIT ? OFFSET ?",
            if status_filter.is_some() {
                "WHERE processing_status = ?"
            } else {
                ""
            }
        );

        let mut rows = if let Some(status) = status_filter {
            conn.query(&sql, params![status.as_str().to_string(), limit, offset])
                .await?
        } else {
            conn.query(&sql, params![limit, offset]).await?
        };

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(row_to_document(&row)?);
        }
        Ok(documents)
    }

    async fn count_documents(&self, status_filter: Option<ProcessingStatus>) -> Result<i64, RagError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT COUNT(*) FROM documents {}",
            if status_filter.is_some() {
                "WHERE processing_status = ?"
            } else {
                ""
            }
        );
        let mut rows = if let Some(status) = status_filter {
            conn.query(&sql, params![status.as_str().to_string()]).await?
        } else {
            conn.query(&sql, ()).await?
        };
        match rows.next().await? {
            Some(row) => int_value(&row, 0),
            None => Ok(0),
        }
    }

    async fn update_document_status(
        &self,
        id: &str,
        new_status: ProcessingStatus,
        failure_message: Option<String>,
        counts: Option<DocumentCounts>,
    ) -> Result<(), RagError> {
        let conn = self.connect()?;
        let now = chrono::Utc::now().to_rfc3339();

        let failure_value = match failure_message {
            Some(msg) => TursoValue::Text(msg),
            None => TursoValue::Null,
        };

        // The legal-predecessor check lives in the UPDATE's WHERE clause
        // rather than a separate read, so the check and the write are one
        // atomic statement: two workers racing to claim the same pending
        // document can't both read `Pending`, both pass, and both proceed.
        const ALL_STATUSES: [ProcessingStatus; 4] = [
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ];
        let allowed_from: Vec<&'static str> = ALL_STATUSES
            .into_iter()
            .filter(|from| from.can_transition_to(new_status))
            .map(|from| from.as_str())
            .collect();
        let placeholders = allowed_from.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let mut status_params: Vec<TursoValue> =
            allowed_from.iter().map(|s| TursoValue::Text(s.to_string())).collect();

        let rows_affected = match counts {
            Some(c) => {
                let mut query_params = vec![
                    TursoValue::Text(new_status.as_str().to_string()),
                    failure_value,
                    TursoValue::Integer(c.character_count),
                    TursoValue::Integer(c.word_count),
                    TursoValue::Integer(c.page_count),
                    TursoValue::Integer(c.chunk_count),
                    TursoValue::Text(now),
                    TursoValue::Text(id.to_string()),
                ];
                query_params.append(&mut status_params);
                conn.execute(
                    &format!(
                        "UPDATE documents SET processing_status = ?, failure_message = ?, \
                         character_count = ?, word_count = ?, page_count = ?, chunk_count = ?, \
                         updated_at = ? WHERE id = ? AND processing_status IN ({placeholders})"
                    ),
                    query_params,
                )
                .await?
            }
            None => {
                let mut query_params = vec![
                    TursoValue::Text(new_status.as_str().to_string()),
                    failure_value,
                    TursoValue::Text(now),
                    TursoValue::Text(id.to_string()),
                ];
                query_params.append(&mut status_params);
                conn.execute(
                    &format!(
                        "UPDATE documents SET processing_status = ?, failure_message = ?, \
                         updated_at = ? WHERE id = ? AND processing_status IN ({placeholders})"
                    ),
                    query_params,
                )
                .await?
            }
        };

        if rows_affected == 0 {
            // Either `id` doesn't exist (surfaces as NotFound) or it exists
            // but wasn't in a legal predecessor state for `new_status`.
            let current = self.get_document(id).await?;
            return Err(RagError::InvalidTransition {
                from: current.processing_status,
                to: new_status,
            });
        }

        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), RagError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM documents WHERE id = ?", params![id.to_string()])
            .await?;
        Ok(())
    }

    async fn create_chunks_batch(&self, document_id: &str, chunks: Vec<NewChunk>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let conn = self.connect()?;

        conn.execute("BEGIN TRANSACTION", ()).await?;

        for chunk in &chunks {
            let id = uuid::Uuid::new_v4().to_string();
            let char_length = chunk.text.chars().count() as i64;
            let embedding = match &chunk.vector {
                Some(v) => TursoValue::Blob(pack_vector(v)),
                None => TursoValue::Null,
            };

            let result = conn
                .execute(
                    &format!(
                        "INSERT INTO document_chunks ({CHUNK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
                    ),
                    vec![
                        TursoValue::Text(id),
                        TursoValue::Text(document_id.to_string()),
                        TursoValue::Integer(chunk.chunk_index),
                        TursoValue::Text(chunk.text.clone()),
                        embedding,
                        TursoValue::Integer(char_length),
                    ],
                )
                .await;

            if let Err(e) = result {
                let _ = conn.execute("ROLLBACK", ()).await;
                return Err(RagError::Store(e.to_string()));
            }
        }

        conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, RagError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE document_id = ? ORDER BY chunk_index ASC"
                ),
                params![document_id.to_string()],
            )
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    async fn get_chunk_neighbors(
        &self,
        document_id: &str,
        chunk_index: i64,
    ) -> Result<(Option<Chunk>, Option<Chunk>), RagError> {
        let conn = self.connect()?;

        let mut prev_rows = conn
            .query(
                &format!(
                    "SELECT {CHUNK_COLUMNS} FROM document_chunks \
                     WHERE document_id = ? AND chunk_index = ?"
                ),
                params![document_id.to_string(), chunk_index - 1],
            )
            .await?;
        let prev = match prev_rows.next().await? {
            Some(row) => Some(row_to_chunk(&row)?),
            None => None,
        };

        let mut next_rows = conn
            .query(
                &format!(
                    "SELECT {CHUNK_COLUMNS} FROM document_chunks \
                     WHERE document_id = ? AND chunk_index = ?"
                ),
                params![document_id.to_string(), chunk_index + 1],
            )
            .await?;
        let next = match next_rows.next().await? {
            Some(row) => Some(row_to_chunk(&row)?),
            None => None,
        };

        Ok((prev, next))
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        k: usize,
        filter_document_id: Option<&str>,
        min_similarity: Option<f64>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let conn = self.connect()?;

        let vector_literal = format!(
            "vector('[{}]')",
            query_vector.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ")
        );
        // vector_distance_cos returns cosine distance in [0, 2]; fold it
        // back to a similarity in [-1, 1] the way the teacher's
        // vector_search does.
        let similarity_expr = format!("(1.0 - (vector_distance_cos(c.embedding, {vector_literal}) / 2.0))");

        let mut conditions = vec!["c.embedding IS NOT NULL".to_string()];
        let mut query_params: Vec<TursoValue> = Vec::new();

        if let Some(doc_id) = filter_document_id {
            conditions.push("c.document_id = ?".to_string());
            query_params.push(TursoValue::Text(doc_id.to_string()));
        }
        if let Some(min_sim) = min_similarity {
            conditions.push(format!("{similarity_expr} >= ?"));
            query_params.push(TursoValue::Real(min_sim));
        }

        let sql = format!(
            "SELECT c.id, c.document_id, c.chunk_index, c.text, c.embedding, c.char_length, \
                    d.filename, {similarity_expr} AS similarity \
             FROM document_chunks c JOIN documents d ON d.id = c.document_id \
             WHERE {} \
             ORDER BY similarity DESC, c.document_id ASC, c.chunk_index ASC \
             LIMIT {}",
            conditions.join(" AND "),
            k
        );

        let mut rows = conn.query(&sql, query_params).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let chunk = row_to_chunk(&row)?;
            let filename = text_value(&row, 6)?;
            let similarity = match row.get_value(7).map_err(|e| RagError::Store(e.to_string()))? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => 0.0,
            };
            results.push(ScoredChunk {
                chunk,
                document_filename: filename,
                similarity: Some(similarity),
                lexical: None,
                combined: similarity,
            });
        }
        Ok(results)
    }

    async fn search_substring(
        &self,
        query_text: &str,
        k: usize,
        filter_document_id: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let conn = self.connect()?;
        let pattern = format!("%{}%", query_text.to_lowercase());

        let mut conditions = vec!["LOWER(c.text) LIKE ?".to_string()];
        let mut query_params: Vec<TursoValue> = vec![TursoValue::Text(pattern)];

        if let Some(doc_id) = filter_document_id {
            conditions.push("c.document_id = ?".to_string());
            query_params.push(TursoValue::Text(doc_id.to_string()));
        }

        let sql = format!(
            "SELECT c.id, c.document_id, c.chunk_index, c.text, c.embedding, c.char_length, d.filename \
             FROM document_chunks c JOIN documents d ON d.id = c.document_id \
             WHERE {} \
             ORDER BY c.document_id ASC, c.chunk_index ASC \
             LIMIT {}",
            conditions.join(" AND "),
            // Over-fetch; lexical scoring needs occurrence counts this
            // query doesn't compute, so rank in Rust after fetching.
            (k * 4).max(k)
        );

        let mut rows = conn.query(&sql, query_params).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let chunk = row_to_chunk(&row)?;
            let filename = text_value(&row, 6)?;
            let occurrences = chunk.text.to_lowercase().matches(&query_text.to_lowercase()).count();
            let lexical = (occurrences as f64 * 0.2).min(1.0);
            results.push(ScoredChunk {
                chunk,
                document_filename: filename,
                similarity: None,
                lexical: Some(lexical),
                combined: lexical,
            });
        }

        results.sort_by(|a, b| {
            b.combined
                .partial_cmp(&a.combined)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        results.truncate(k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    async fn new_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    fn sample_document(id: &str, hash: &str) -> NewDocument {
        NewDocument {
            id: id.to_string(),
            filename: "a.txt".to_string(),
            file_type: FileType::Txt,
            size_bytes: 10,
            content_hash: hash.to_string(),
            storage_path: format!("/data/{hash}"),
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = new_store().await;
        let created = store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();
        assert_eq!(created.processing_status, ProcessingStatus::Pending);

        let fetched = store.get_document("doc-1").await.unwrap();
        assert_eq!(fetched.content_hash, "hash-1");
    }

    #[tokio::test]
    async fn duplicate_hash_collapses_to_existing_id() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();

        let err = store
            .create_document(sample_document("doc-2", "hash-1"))
            .await
            .unwrap_err();
        match err {
            RagError::DuplicateContent(id) => assert_eq!(id, "doc-1"),
            other => panic!("expected DuplicateContent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();

        let err = store
            .update_document_status("doc-1", ProcessingStatus::Completed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn chunk_batch_is_atomic_and_ordered() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();
        store
            .update_document_status("doc-1", ProcessingStatus::Processing, None, None)
            .await
            .unwrap();

        let chunks = vec![
            NewChunk { chunk_index: 0, text: "first".to_string(), vector: Some(vec![1.0, 0.0]) },
            NewChunk { chunk_index: 1, text: "second".to_string(), vector: Some(vec![0.0, 1.0]) },
        ];
        store.create_chunks_batch("doc-1", chunks).await.unwrap();

        let fetched = store.get_chunks("doc-1").await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].chunk_index, 0);
        assert_eq!(fetched[1].chunk_index, 1);
        assert_eq!(fetched[0].vector.as_ref().unwrap(), &vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn delete_document_cascades_chunks() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();
        store
            .update_document_status("doc-1", ProcessingStatus::Processing, None, None)
            .await
            .unwrap();
        store
            .create_chunks_batch(
                "doc-1",
                vec![NewChunk { chunk_index: 0, text: "x".to_string(), vector: None }],
            )
            .await
            .unwrap();

        store.delete_document("doc-1").await.unwrap();
        assert!(store.get_document("doc-1").await.is_err());
        assert!(store.get_chunks("doc-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_vector_orders_by_similarity_descending() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();
        store
            .update_document_status("doc-1", ProcessingStatus::Processing, None, None)
            .await
            .unwrap();
        store
            .create_chunks_batch(
                "doc-1",
                vec![
                    NewChunk { chunk_index: 0, text: "close".to_string(), vector: Some(vec![1.0, 0.0]) },
                    NewChunk { chunk_index: 1, text: "far".to_string(), vector: Some(vec![0.0, 1.0]) },
                ],
            )
            .await
            .unwrap();

        let results = store.search_vector(&[1.0, 0.0], 10, None, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "close");
    }

    #[tokio::test]
    async fn search_substring_scores_by_occurrence() {
        let store = new_store().await;
        store.create_document(sample_document("doc-1", "hash-1")).await.unwrap();
        store
            .update_document_status("doc-1", ProcessingStatus::Processing, None, None)
            .await
            .unwrap();
        store
            .create_chunks_batch(
                "doc-1",
                vec![NewChunk {
                    chunk_index: 0,
                    text: "rust rust rust is great".to_string(),
                    vector: None,
                }],
            )
            .await
            .unwrap();

        let results = store.search_substring("rust", 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lexical, Some(0.6));
    }
}
