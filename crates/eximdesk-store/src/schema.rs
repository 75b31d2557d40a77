//! Registry database schema.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS hsn_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hsn_code TEXT NOT NULL,
    heading_code TEXT NOT NULL DEFAULT '',
    chapter TEXT,
    commodity TEXT,
    description TEXT,
    goods_description TEXT,
    gst_rate REAL,
    source TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER,
    UNIQUE (hsn_code, heading_code)
);

CREATE INDEX IF NOT EXISTS idx_hsn_codes_code ON hsn_codes(hsn_code);

CREATE TABLE IF NOT EXISTS code_embeddings (
    code_id INTEGER PRIMARY KEY REFERENCES hsn_codes(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    scale REAL NOT NULL,
    offset_val REAL NOT NULL
);
"#;
