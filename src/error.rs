//! Error types for the `isplit` crate.
//!
//! This module defines [`SplitError`], the error type returned by every
//! fallible operation in the crate. Segmentation itself never fails; all
//! variants describe configuration mistakes or faults at the container I/O
//! boundary, and carry the clip ordinal and path where one is known.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `isplit` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SplitError {
    /// A required parameter is missing or invalid. Raised before any
    /// segmentation or extraction work starts.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The source media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoPackets::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A clip descriptor reaches past the end of the frame source.
    #[error(
        "Clip of {frame_count} frames starting at frame {start_index} is out of range (source has {total_frames} frames)"
    )]
    ClipOutOfRange {
        /// First frame of the requested slice.
        start_index: u64,
        /// Number of frames requested.
        frame_count: u64,
        /// Number of frames the source actually holds.
        total_frames: u64,
    },

    /// A clip could not be written to its destination.
    #[error("Failed to write clip to {path}: {reason}")]
    ClipWrite {
        /// Destination of the clip.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// Extraction of one clip failed; wraps the underlying error with the
    /// clip's keyframe ordinal.
    #[error("Clip {ordinal} ({path}) failed: {source}")]
    ClipFailed {
        /// Keyframe ordinal of the failing clip.
        ordinal: u64,
        /// Destination that was being written.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<SplitError>,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for SplitError {
    fn from(error: FfmpegError) -> Self {
        SplitError::FfmpegError(error.to_string())
    }
}
