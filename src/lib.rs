//! # isplit
//!
//! Split a video into clips at its keyframes (I-frames), without re-encoding.
//!
//! Splitting happens in two phases. The segmenter makes one pass over the
//! frame sequence, looking only at each frame's keyframe flag, and builds a
//! [`ClipTable`]: clip descriptors (start frame, frame count) keyed by
//! keyframe ordinal, optionally restricted to an inclusive range of ordinals.
//! The table is then handed to a [`Splitter`], which writes one clip per
//! entry as `{prefix}-{ordinal}.{extension}`.
//!
//! The core works on any [`FrameSource`] / [`ClipSink`] pair. The crate ships
//! an FFmpeg-backed pair, [`VideoPackets`] and [`ContainerWriter`], powered by
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next).
//!
//! ## Quick Start
//!
//! ### Split a File
//!
//! ```no_run
//! use isplit::{Bounds, ClipNaming, SplitOptions};
//!
//! let naming = ClipNaming::for_input("clips/file_out", "file.avi").unwrap();
//! let options = SplitOptions::new().with_bounds(Bounds::new(Some(2), Some(5)));
//! let report = isplit::split_file("file.avi", &naming, &options).unwrap();
//! println!("{} clips written", report.written.len());
//! ```
//!
//! ### Segment Keyframe Flags
//!
//! ```
//! use isplit::{Bounds, ClipDescriptor, segment};
//!
//! let flags = [true, false, false, true, false];
//! let table = segment(flags, Bounds::default());
//! assert_eq!(table.get(1), Some(&ClipDescriptor::new(0, 2)));
//! assert_eq!(table.get(2), Some(&ClipDescriptor::new(3, 1)));
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod clip;
pub mod container;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod options;
pub mod progress;
pub mod segment;
pub mod split;

pub use clip::{ClipNaming, DEFAULT_EXTENSION, extract_clip};
pub use container::{ContainerWriter, FramePacket, VideoPackets};
pub use error::SplitError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{ClipSink, FrameList, FrameSource, Keyframe};
pub use options::{FailurePolicy, SplitOptions};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use segment::{
    Bounds, ClipDescriptor, ClipTable, SegmentOptions, TrailingFlush, segment,
    segment_with_options,
};
pub use split::{FailedClip, SplitReport, Splitter, WrittenClip, split_file};
