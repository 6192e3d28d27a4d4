//! The `HugoContent` half of the dual-sink persister: each record becomes a
//! `---`-delimited YAML front-matter file at a deterministic path. Ported
//! from `cleanupContentOutputDirs`/`rmGenerated`/`generatedFilePath`.

use std::path::{Path, PathBuf};

use feedmesh_core::{Classification, CrawlError, Feed, Link, Post};

const FEED_PREFIX: &str = "feed-";
const POST_PREFIX: &str = "post-";
const LINK_PREFIX: &str = "link-";

pub struct HugoContent {
    reading_folder: PathBuf,
    following_folder: PathBuf,
    discover_folder: PathBuf,
    network_folder: PathBuf,
    remove_old_content: bool,
}

impl HugoContent {
    pub fn new(
        reading_folder: impl Into<PathBuf>,
        following_folder: impl Into<PathBuf>,
        discover_folder: impl Into<PathBuf>,
        network_folder: impl Into<PathBuf>,
        remove_old_content: bool,
    ) -> Self {
        Self {
            reading_folder: reading_folder.into(),
            following_folder: following_folder.into(),
            discover_folder: discover_folder.into(),
            network_folder: network_folder.into(),
            remove_old_content,
        }
    }

    /// Create the output folders and, when configured, purge their
    /// previously generated files before this run writes anything new.
    pub fn prepare(&self) -> Result<(), CrawlError> {
        for folder in [&self.reading_folder, &self.following_folder, &self.discover_folder, &self.network_folder] {
            std::fs::create_dir_all(folder).map_err(|e| CrawlError::Storage(e.to_string()))?;
        }
        if self.remove_old_content {
            remove_generated(POST_PREFIX, &self.reading_folder)?;
            remove_generated(FEED_PREFIX, &self.following_folder)?;
            remove_generated(FEED_PREFIX, &self.discover_folder)?;
            remove_generated(LINK_PREFIX, &self.network_folder)?;
        }
        Ok(())
    }

    pub fn write_feed(&self, feed: &Feed) -> Result<(), CrawlError> {
        let folder = match feed.classification {
            Classification::Direct => &self.following_folder,
            Classification::Discover => &self.discover_folder,
        };
        write_front_matter(&folder.join(format!("{FEED_PREFIX}{}.md", feed.id)), feed)
    }

    pub fn write_post(&self, post: &Post) -> Result<(), CrawlError> {
        write_front_matter(&self.reading_folder.join(format!("{POST_PREFIX}{}.md", post.id)), post)
    }

    pub fn write_link(&self, link: &Link) -> Result<(), CrawlError> {
        write_front_matter(&self.network_folder.join(format!("{LINK_PREFIX}{}.md", link.id)), link)
    }
}

fn write_front_matter<T: serde::Serialize>(path: &Path, record: &T) -> Result<(), CrawlError> {
    let body = serde_yaml::to_string(record).map_err(|e| CrawlError::Storage(e.to_string()))?;
    let content = format!("---\n{body}---\n");
    std::fs::write(path, content).map_err(|e| CrawlError::Storage(e.to_string()))
}

fn remove_generated(prefix: &str, folder: &Path) -> Result<(), CrawlError> {
    let entries = match std::fs::read_dir(folder) {
        Ok(e) => e,
        Err(_) => return Ok(()),
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    Ok(())
}
