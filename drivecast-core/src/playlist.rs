//! Playlist built from the audio files of a folder listing.

use crate::drive::{DriveItem, DriveSource, FolderPage, join_path};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "drivecast::playlist";

/// One playable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEntry {
    /// File name, unique within its folder
    pub name: String,
    /// Full drive path
    pub path: String,
    /// Backend metadata
    pub item: DriveItem,
}

impl AudioEntry {
    /// Create an entry for `item` inside `folder`
    #[must_use]
    pub fn new(folder: &str, item: DriveItem) -> Self {
        Self {
            name: item.name.clone(),
            path: join_path(folder, &item.name),
            item,
        }
    }
}

/// Audio entries of one folder, in listing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<AudioEntry>,
    complete: bool,
}

impl Playlist {
    /// Build from listing pages, keeping only audio files
    #[must_use]
    pub fn from_pages(folder: &str, pages: &[FolderPage]) -> Self {
        let entries = pages
            .iter()
            .flat_map(|page| page.items.iter())
            .filter(|item| item.is_audio())
            .map(|item| AudioEntry::new(folder, item.clone()))
            .collect();

        let complete = pages.last().map_or(true, |page| page.next.is_none());

        Self { entries, complete }
    }

    #[must_use]
    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every page of the listing was fetched
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Position of the entry called `name`
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AudioEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entry right after the one called `name`
    #[must_use]
    pub fn next_after(&self, name: &str) -> Option<&AudioEntry> {
        self.position(name)
            .and_then(|i| self.entries.get(i + 1))
    }
}

/// Fetches a folder page by page and materializes its playlist
pub struct PlaylistBuilder<'a> {
    drive: &'a dyn DriveSource,
    max_pages: usize,
}

impl<'a> PlaylistBuilder<'a> {
    pub fn new(drive: &'a dyn DriveSource, max_pages: usize) -> Self {
        Self {
            drive,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetch every page of `folder` and build its playlist.
    ///
    /// A failed page ends pagination: the entries fetched so far are kept and
    /// the playlist is flagged incomplete.
    pub async fn build(&self, folder: &str) -> Playlist {
        let mut pages: Vec<FolderPage> = Vec::new();
        let mut next: Option<String> = None;

        loop {
            if pages.len() >= self.max_pages {
                warn!(
                    target: LOG_TARGET,
                    "Stopping listing of {} after {} pages", folder, self.max_pages
                );
                break;
            }

            match self.drive.fetch_folder_page(folder, next.as_deref()).await {
                Ok(page) => {
                    debug!(
                        target: LOG_TARGET,
                        "Fetched page {} of {} ({} items, more: {})",
                        pages.len() + 1,
                        folder,
                        page.items.len(),
                        page.next.is_some()
                    );
                    next.clone_from(&page.next);
                    pages.push(page);
                    if next.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        target: LOG_TARGET,
                        "Failed to fetch page {} of {}: {}",
                        pages.len() + 1,
                        folder,
                        e
                    );
                    let mut playlist = Playlist::from_pages(folder, &pages);
                    playlist.complete = false;
                    return playlist;
                }
            }
        }

        let playlist = Playlist::from_pages(folder, &pages);
        info!(
            target: LOG_TARGET,
            "Built playlist for {}: {} audio files from {} pages",
            folder,
            playlist.len(),
            pages.len()
        );
        playlist
    }
}
