//! Intake: turns picked files into [`QueuedFile`]s ready for upload.
//!
//! # Pipeline
//!
//! 1. **Filter**: reject anything that is not a JPEG, PNG or GIF
//! 2. **Queue**: assign an id and capture name, extension and size
//! 3. **Thumbnail**: downscale a preview; files that fail are dropped
//!
//! [`QueuedFile`]: mediadrop_transfer::QueuedFile

pub mod batch;
pub mod filter;
pub mod thumbnail;

pub use batch::{IntakeProgress, IntakeReport, Rejection, SourceFile, process_batch, remove};
pub use filter::{ACCEPTED_TYPES, check_accepted};
pub use thumbnail::{ImageThumbnailer, Thumbnailer};

/// Errors produced while accepting files.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("File type must be {types}. {name}.", types = ACCEPTED_TYPES.join(", "))]
    UnsupportedType { name: String },

    #[error("{name} is invalid image format.")]
    Thumbnail {
        name: String,
        #[source]
        source: ThumbnailError,
    },
}

/// Errors produced by a [`Thumbnailer`].
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("cannot decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("cannot encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}
