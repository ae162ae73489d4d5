//! Library item folders.

use anyhow::Result;
use sqlx::Row;

use super::db::{unix_timestamp, LibraryDb};

impl LibraryDb {
    /// Bind `item_id` to `base_path`, replacing any earlier binding.
    pub async fn set_library_item_path(&self, item_id: &str, base_path: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO library_items (id, base_path, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                base_path = excluded.base_path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item_id)
        .bind(base_path)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_library_item_path(&self, item_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT base_path FROM library_items WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("base_path")))
    }
}
