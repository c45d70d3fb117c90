//! Thumbnails for the month grid
//!
//! Pixel work happens elsewhere; this module only locates a thumbnail for a
//! clip and turns failures into "no thumbnail".

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Datelike;
use serde::Serialize;
use tokio::fs;
use tracing::warn;

use super::models::ClipRef;
use super::paths::THUMBNAILS_DIR;
use crate::error::{JournalError, Result};

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Locator of a still image for `clip_uri`
    async fn generate_thumbnail(&self, clip_uri: &str) -> Result<String>;
}

/// Looks up pre-generated stills at `thumbnails/<YYYY>/<MM>/<clip stem>.jpg`
#[derive(Debug, Clone)]
pub struct SidecarThumbnails {
    root: PathBuf,
}

impl SidecarThumbnails {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join(THUMBNAILS_DIR),
        }
    }

    /// Where the still for `clip_uri` is expected, if the uri names a clip
    pub fn thumbnail_path(&self, clip_uri: &str) -> Option<PathBuf> {
        let clip = Path::new(clip_uri);
        let stem = clip.file_stem()?.to_str()?;
        let month_dir = clip.parent()?;
        let month = month_dir.file_name()?.to_str()?;
        let year = month_dir.parent()?.file_name()?.to_str()?;

        Some(self.root.join(year).join(month).join(format!("{stem}.jpg")))
    }
}

#[async_trait]
impl ThumbnailGenerator for SidecarThumbnails {
    async fn generate_thumbnail(&self, clip_uri: &str) -> Result<String> {
        let path = self.thumbnail_path(clip_uri).ok_or_else(|| {
            JournalError::read(
                clip_uri,
                io::Error::new(io::ErrorKind::InvalidInput, "not a bucketed clip"),
            )
        })?;

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path.to_string_lossy().into_owned()),
            Ok(_) => Err(JournalError::read(
                path,
                io::Error::new(io::ErrorKind::InvalidData, "thumbnail is not a file"),
            )),
            Err(e) => Err(JournalError::read(path, e)),
        }
    }
}

/// One cell of the month grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridEntry {
    pub clip: ClipRef,
    pub thumbnail: Option<String>,
    /// Day of month shown on the cell
    pub label: String,
}

/// Pair each clip with its thumbnail, keeping clip order
pub async fn attach_thumbnails(
    generator: &dyn ThumbnailGenerator,
    clips: Vec<ClipRef>,
) -> Vec<GridEntry> {
    let mut entries = Vec::with_capacity(clips.len());

    for clip in clips {
        let thumbnail = match generator.generate_thumbnail(&clip.uri).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(uri = %clip.uri, error = %e, "No thumbnail for clip");
                None
            }
        };
        let label = clip.captured_at.day().to_string();
        entries.push(GridEntry {
            clip,
            thumbnail,
            label,
        });
    }

    entries
}
