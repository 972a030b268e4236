//! SQLite database layer for routing rules

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Models seeded into every fresh database, with their canned response text
pub const DEFAULT_MODELS: &[(&str, &str)] = &[
    (
        "openai/gpt-3.5",
        "OpenAI: Processed your prompt with advanced language understanding.",
    ),
    (
        "anthropic/claude-v1",
        "Anthropic: Your prompt has been interpreted with ethical AI principles.",
    ),
    (
        "gemini/gemini-alpha",
        "Gemini: Your request has been processed using next-gen AI.",
    ),
];

/// Known chat model with its canned response text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Prompt routing rule (regex over the prompt, first match wins)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRule {
    pub id: i64,
    pub original_model: String,
    pub regex_pattern: String,
    pub redirect_model: String,
    pub created_at: DateTime<Utc>,
}

/// File routing rule keyed by lower-cased file extension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRule {
    pub id: i64,
    pub file_type: String,
    pub redirect_provider: String,
    pub redirect_model: String,
    pub created_at: DateTime<Utc>,
}

/// Row counts per table, for the status endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreStats {
    pub models: i64,
    pub prompt_rules: i64,
    pub file_rules: i64,
}

/// SQLite database wrapper (thread-safe via Arc<Mutex>)
pub struct RuleDb {
    conn: Arc<Mutex<Connection>>,
}

impl RuleDb {
    /// Initialize database with schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite database")?;

        info!("Initializing rule database at {:?}", path.as_ref());

        // Rule evaluation order is insertion order, encoded as the rowid.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS routing_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_model TEXT NOT NULL,
                regex_pattern TEXT NOT NULL,
                redirect_model TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_routing_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_type TEXT NOT NULL UNIQUE,
                redirect_provider TEXT NOT NULL,
                redirect_model TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        debug!("Database schema initialized successfully");

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Insert the default model catalog, skipping names already present.
    /// Returns the number of models actually inserted.
    pub async fn seed_default_models(&self) -> Result<usize> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let now = Utc::now();
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            let mut inserted = 0;
            for (name, description) in DEFAULT_MODELS {
                inserted += conn.execute(
                    "INSERT OR IGNORE INTO models (name, description, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![name, description, now.to_rfc3339()],
                )?;
            }

            if inserted > 0 {
                info!("Seeded {} default models", inserted);
            }
            Ok(inserted)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Get all known models in insertion order
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_at
                 FROM models
                 ORDER BY id",
            )?;

            let models = stmt
                .query_map([], Self::row_to_model)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(models)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Look up a model by exact name
    pub async fn find_model(&self, name: &str) -> Result<Option<ModelEntry>> {
        let conn = Arc::clone(&self.conn);
        let name = name.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            let result = conn
                .query_row(
                    "SELECT id, name, description, created_at
                     FROM models WHERE name = ?1",
                    params![&name],
                    Self::row_to_model,
                )
                .optional()?;

            Ok(result)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Append a prompt routing rule, returning its id
    pub async fn append_prompt_rule(
        &self,
        original_model: &str,
        regex_pattern: &str,
        redirect_model: &str,
    ) -> Result<i64> {
        let conn = Arc::clone(&self.conn);
        let original_model = original_model.to_owned();
        let regex_pattern = regex_pattern.to_owned();
        let redirect_model = redirect_model.to_owned();

        tokio::task::spawn_blocking(move || {
            let now = Utc::now();
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            conn.execute(
                "INSERT INTO routing_rules (original_model, regex_pattern, redirect_model, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &original_model,
                    &regex_pattern,
                    &redirect_model,
                    now.to_rfc3339(),
                ],
            )?;

            let id = conn.last_insert_rowid();
            debug!("Appended prompt rule #{}: /{}/ -> {}", id, regex_pattern, redirect_model);
            Ok(id)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Get all prompt routing rules in insertion order
    pub async fn list_prompt_rules(&self) -> Result<Vec<PromptRule>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            let mut stmt = conn.prepare(
                "SELECT id, original_model, regex_pattern, redirect_model, created_at
                 FROM routing_rules
                 ORDER BY id",
            )?;

            let rules = stmt
                .query_map([], Self::row_to_prompt_rule)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rules)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Append a file routing rule, returning its id.
    /// Returns None when a rule with the same file type already exists.
    pub async fn append_file_rule(
        &self,
        file_type: &str,
        redirect_provider: &str,
        redirect_model: &str,
    ) -> Result<Option<i64>> {
        let conn = Arc::clone(&self.conn);
        let file_type = file_type.to_owned();
        let redirect_provider = redirect_provider.to_owned();
        let redirect_model = redirect_model.to_owned();

        tokio::task::spawn_blocking(move || {
            let now = Utc::now();
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            // INSERT OR IGNORE makes the uniqueness check atomic with the append.
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO file_routing_rules (file_type, redirect_provider, redirect_model, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &file_type,
                    &redirect_provider,
                    &redirect_model,
                    now.to_rfc3339(),
                ],
            )?;

            if inserted == 0 {
                return Ok(None);
            }

            let id = conn.last_insert_rowid();
            debug!("Appended file rule #{}: .{} -> {}/{}", id, file_type, redirect_provider, redirect_model);
            Ok(Some(id))
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Look up a file routing rule by exact file type
    pub async fn find_file_rule(&self, file_type: &str) -> Result<Option<FileRule>> {
        let conn = Arc::clone(&self.conn);
        let file_type = file_type.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            let result = conn
                .query_row(
                    "SELECT id, file_type, redirect_provider, redirect_model, created_at
                     FROM file_routing_rules WHERE file_type = ?1",
                    params![&file_type],
                    Self::row_to_file_rule,
                )
                .optional()?;

            Ok(result)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Get all file routing rules in insertion order
    pub async fn list_file_rules(&self) -> Result<Vec<FileRule>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            let mut stmt = conn.prepare(
                "SELECT id, file_type, redirect_provider, redirect_model, created_at
                 FROM file_routing_rules
                 ORDER BY id",
            )?;

            let rules = stmt
                .query_map([], Self::row_to_file_rule)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rules)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Row counts for all three tables
    pub async fn stats(&self) -> Result<StoreStats> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            let models = conn.query_row("SELECT COUNT(*) FROM models", [], |row| row.get(0))?;
            let prompt_rules =
                conn.query_row("SELECT COUNT(*) FROM routing_rules", [], |row| row.get(0))?;
            let file_rules =
                conn.query_row("SELECT COUNT(*) FROM file_routing_rules", [], |row| row.get(0))?;

            Ok(StoreStats { models, prompt_rules, file_rules })
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Helper to convert row to ModelEntry
    fn row_to_model(row: &rusqlite::Row) -> rusqlite::Result<ModelEntry> {
        Ok(ModelEntry {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get::<_, String>(3)?.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Helper to convert row to PromptRule
    fn row_to_prompt_rule(row: &rusqlite::Row) -> rusqlite::Result<PromptRule> {
        Ok(PromptRule {
            id: row.get(0)?,
            original_model: row.get(1)?,
            regex_pattern: row.get(2)?,
            redirect_model: row.get(3)?,
            created_at: row.get::<_, String>(4)?.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Helper to convert row to FileRule
    fn row_to_file_rule(row: &rusqlite::Row) -> rusqlite::Result<FileRule> {
        Ok(FileRule {
            id: row.get(0)?,
            file_type: row.get(1)?,
            redirect_provider: row.get(2)?,
            redirect_model: row.get(3)?,
            created_at: row.get::<_, String>(4)?.parse().unwrap_or_else(|_| Utc::now()),
        })
    }
}
