use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

/// Local key/value preferences. Profile, job and application data are never
/// written here; the server owns them.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open preferences at {}", path.display()))?;
        let db = Self { conn, path };
        db.init()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn data_dir() -> PathBuf {
        // Use XDG data directory or fallback
        match directories::ProjectDirs::from("", "", "lume") {
            Some(proj_dirs) => proj_dirs.data_dir().to_path_buf(),
            None => PathBuf::from("."),
        }
    }

    fn default_path() -> PathBuf {
        Self::data_dir().join("lume.db")
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read preference '{}'", key))
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .with_context(|| format!("Failed to save preference '{}'", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_preference_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_preference("theme").unwrap(), None);
    }

    #[test]
    fn test_set_preference_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.set_preference("theme", "dark").unwrap();
        db.set_preference("theme", "light").unwrap();
        assert_eq!(db.get_preference("theme").unwrap().as_deref(), Some("light"));
    }
}
