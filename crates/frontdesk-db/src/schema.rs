pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    name TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);
"#;
