//! `shelver item` – show or bind a library item's folder.

use anyhow::Result;
use shelver_core::library_db::LibraryDb;
use std::path::Path;

pub async fn run_item(db: &LibraryDb, id: &str, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        db.set_library_item_path(id, &path.to_string_lossy()).await?;
    }
    match db.get_library_item_path(id).await? {
        Some(base) => println!("{id}\t{base}"),
        None => println!("{id}\t(no folder)"),
    }
    Ok(())
}
