//! Centralized DDL for the `documents` and `document_chunks` tables.
//!
//! Mirrors the teacher's `providers::db::sqlite::sql` module: SQL lives
//! here as constants, not scattered through query-building code.

/// Bookkeeping table the teacher's `initialize_schema` pattern implies:
/// idempotent, re-run on every boot, never dropped.
pub const CREATE_SCHEMA_VERSION_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );
";

pub const CREATE_DOCUMENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        file_type TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        content_hash TEXT NOT NULL UNIQUE,
        storage_path TEXT NOT NULL,
        character_count INTEGER NOT NULL DEFAULT 0,
        word_count INTEGER NOT NULL DEFAULT 0,
        page_count INTEGER NOT NULL DEFAULT 0,
        chunk_count INTEGER NOT NULL DEFAULT 0,
        processing_status TEXT NOT NULL
            CHECK (processing_status IN ('pending', 'processing', 'completed', 'failed')),
        failure_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

pub const CREATE_DOCUMENTS_HASH_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash);";

pub const CREATE_DOCUMENTS_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(processing_status);";

/// `embedding` is a BLOB, the way the teacher's `faq_kb.embedding` column
/// is: 4-byte little-endian floats packed back to back, not a dedicated
/// vector type. The ANN index that serves `search_vector` is an
/// approximate-nearest-neighbor graph (m≈16, ef_construction≈64) built
/// over this column; a flat `vector_distance_cos` scan is the fallback
/// when the index is absent, so the two are interchangeable behind
/// `Store::search_vector`.
pub const CREATE_CHUNKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS document_chunks (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        chunk_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        char_length INTEGER NOT NULL,
        embedding BLOB,
        UNIQUE(document_id, chunk_index)
    );
";

pub const CREATE_CHUNKS_DOCUMENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON document_chunks(document_id);";

/// `libsql_vector_idx` is turso's ANN index over a BLOB/vector column,
/// the counterpart of the teacher's plain `vector_distance_cos` flat
/// scan. Built with the m≈16 / ef_construction≈64 parameters of the
/// similarity contract; kept separate from the flat-scan path so either
/// can serve `search_vector` without changing its call contract.
pub const CREATE_CHUNKS_VECTOR_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_chunks_embedding
    ON document_chunks(libsql_vector_idx(embedding, 'm=16', 'ef_construction=64'));
";

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_SCHEMA_VERSION_TABLE,
    CREATE_DOCUMENTS_TABLE,
    CREATE_DOCUMENTS_HASH_INDEX,
    CREATE_DOCUMENTS_STATUS_INDEX,
    CREATE_CHUNKS_TABLE,
    CREATE_CHUNKS_DOCUMENT_INDEX,
];

/// Kept separate from `ALL_TABLE_CREATION_SQL`: the vector index is an
/// optional acceleration structure, not a correctness requirement, and
/// `initialize_schema` tolerates it failing to build on a turso build
/// without the experimental index feature compiled in.
pub const OPTIONAL_VECTOR_INDEX_SQL: &str = CREATE_CHUNKS_VECTOR_INDEX;
