//! `shelver add` – register an accepted download.

use anyhow::Result;
use clap::Args;
use shelver_core::coordinator::DownloadQueueCoordinator;
use shelver_core::library_db::{DownloadMetadata, MetaKey, NewDownload};

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Release title.
    pub title: String,
    /// Download client that will fetch it.
    #[arg(long)]
    pub client: Option<String>,
    /// Torrent info hash (correlation key).
    #[arg(long)]
    pub hash: Option<String>,
    /// NZB id (correlation key for usenet clients).
    #[arg(long)]
    pub nzb: Option<String>,
    /// Library item the download belongs to.
    #[arg(long, value_name = "ID")]
    pub item: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    /// Book title, when it differs from the release title.
    #[arg(long)]
    pub book: Option<String>,
    #[arg(long)]
    pub series: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
}

impl AddArgs {
    fn metadata(&self) -> DownloadMetadata {
        let mut meta = DownloadMetadata::default();
        let fields = [
            (MetaKey::TorrentHash, &self.hash),
            (MetaKey::NzbId, &self.nzb),
            (MetaKey::Author, &self.author),
            (MetaKey::BookTitle, &self.book),
            (MetaKey::Series, &self.series),
            (MetaKey::Year, &self.year),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                meta.set(key, v.clone());
            }
        }
        meta
    }
}

pub async fn run_add(coordinator: &DownloadQueueCoordinator, args: AddArgs) -> Result<()> {
    let new = NewDownload {
        metadata: args.metadata(),
        title: args.title,
        library_item_id: args.item,
        client_id: args.client,
        total_size: None,
    };
    let download = coordinator.register_download(&new).await?;
    println!("{}", download.id);
    Ok(())
}
