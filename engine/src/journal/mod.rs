//! Video journal: one clip per day, month buckets, monthly recaps

pub mod events;
pub mod models;
pub mod paths;
pub mod recap;
pub mod service;
pub mod store;
pub mod thumbnails;

pub use events::{ClipChange, ClipEvent};
pub use models::{ClipRef, DayKey, MonthKey, RecapArtifact};
pub use recap::{RecapBanner, RecapComposer, RecapOffer};
pub use service::Journal;
pub use store::{CleanupStats, ClipStore, FsClipStore};
pub use thumbnails::{GridEntry, SidecarThumbnails, ThumbnailGenerator};
