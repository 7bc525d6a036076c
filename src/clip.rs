//! Clip extraction and output naming.
//!
//! [`extract_clip`] slices exactly the frames a [`ClipDescriptor`] describes
//! out of a [`FrameSource`] and hands them to a [`ClipSink`].
//! [`ClipNaming`] derives the destination of each clip from an output prefix:
//! `{prefix}-{ordinal}.{extension}`.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use isplit::{ClipNaming, SplitError};
//!
//! let naming = ClipNaming::new("clips/scene", "avi")?;
//! assert_eq!(naming.path_for(3), Path::new("clips/scene-3.avi"));
//! # Ok::<(), SplitError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::error::SplitError;
use crate::frame::{ClipSink, FrameSource};
use crate::segment::ClipDescriptor;

/// Container extension used when the input path has none.
pub const DEFAULT_EXTENSION: &str = "avi";

/// Write the frames described by `descriptor` from `source` to `destination`.
///
/// # Errors
///
/// Returns [`SplitError::ClipOutOfRange`] if the descriptor reaches past the
/// end of `source`, or whatever error the sink reports.
pub fn extract_clip<S, K>(
    source: &S,
    sink: &mut K,
    descriptor: &ClipDescriptor,
    destination: &Path,
) -> Result<(), SplitError>
where
    S: FrameSource + ?Sized,
    K: ClipSink<S::Frame> + ?Sized,
{
    let total_frames = source.frame_count();
    let frames = source
        .slice(descriptor.start_index, descriptor.frame_count)
        .ok_or(SplitError::ClipOutOfRange {
            start_index: descriptor.start_index,
            frame_count: descriptor.frame_count,
            total_frames,
        })?;

    log::debug!(
        "Clipping {} frames starting at frame {} -> {}",
        descriptor.frame_count,
        descriptor.start_index,
        destination.display()
    );
    sink.write_clip(frames, destination)
}

/// Derives output paths for clips from a prefix and container extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipNaming {
    prefix: String,
    extension: String,
}

impl ClipNaming {
    /// Create a naming scheme.
    ///
    /// A leading `.` on `extension` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Configuration`] if the prefix or extension is
    /// empty.
    pub fn new<P: Into<String>, E: AsRef<str>>(prefix: P, extension: E) -> Result<Self, SplitError> {
        let prefix = prefix.into();
        let extension = extension.as_ref().trim().trim_start_matches('.').to_string();

        if prefix.trim().is_empty() {
            return Err(SplitError::Configuration(
                "output prefix must not be empty".to_string(),
            ));
        }
        if extension.is_empty() {
            return Err(SplitError::Configuration(
                "output extension must not be empty".to_string(),
            ));
        }

        Ok(Self { prefix, extension })
    }

    /// Create a naming scheme that reuses the container extension of
    /// `input`, falling back to [`DEFAULT_EXTENSION`].
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Configuration`] if the prefix is empty.
    pub fn for_input<P: Into<String>, I: AsRef<Path>>(
        prefix: P,
        input: I,
    ) -> Result<Self, SplitError> {
        let extension = input
            .as_ref()
            .extension()
            .and_then(|extension| extension.to_str())
            .filter(|extension| !extension.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
            .to_ascii_lowercase();
        Self::new(prefix, extension)
    }

    /// The output prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The container extension, without a leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Destination of the clip keyed by `ordinal`.
    pub fn path_for(&self, ordinal: u64) -> PathBuf {
        PathBuf::from(format!("{}-{}.{}", self.prefix, ordinal, self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameList;

    #[derive(Default)]
    struct Recording {
        clips: Vec<(Vec<bool>, PathBuf)>,
    }

    impl ClipSink<bool> for Recording {
        fn write_clip(&mut self, frames: &[bool], destination: &Path) -> Result<(), SplitError> {
            self.clips.push((frames.to_vec(), destination.to_path_buf()));
            Ok(())
        }
    }

    #[test]
    fn extracts_exact_slice() {
        let source = FrameList::new(vec![true, false, false, true, false]);
        let mut sink = Recording::default();

        extract_clip(
            &source,
            &mut sink,
            &ClipDescriptor::new(3, 2),
            Path::new("out-2.avi"),
        )
        .unwrap();

        assert_eq!(sink.clips.len(), 1);
        assert_eq!(sink.clips[0].0, vec![true, false]);
        assert_eq!(sink.clips[0].1, PathBuf::from("out-2.avi"));
    }

    #[test]
    fn out_of_range_descriptor_is_rejected() {
        let source = FrameList::new(vec![true, false, false]);
        let mut sink = Recording::default();

        let error = extract_clip(
            &source,
            &mut sink,
            &ClipDescriptor::new(2, 5),
            Path::new("out-1.avi"),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            SplitError::ClipOutOfRange {
                start_index: 2,
                frame_count: 5,
                total_frames: 3
            }
        ));
        assert!(sink.clips.is_empty());
    }

    #[test]
    fn naming_follows_prefix_ordinal_extension() {
        let naming = ClipNaming::new("file_out", ".AVI").unwrap();
        assert_eq!(naming.extension(), "AVI");
        assert_eq!(naming.path_for(0), PathBuf::from("file_out-0.AVI"));
        assert_eq!(naming.path_for(12), PathBuf::from("file_out-12.AVI"));
    }

    #[test]
    fn naming_rejects_empty_parts() {
        assert!(matches!(
            ClipNaming::new("  ", "avi"),
            Err(SplitError::Configuration(_))
        ));
        assert!(matches!(
            ClipNaming::new("out", "."),
            Err(SplitError::Configuration(_))
        ));
    }

    #[test]
    fn naming_for_input_uses_input_extension() {
        let naming = ClipNaming::for_input("out", "videos/source.MKV").unwrap();
        assert_eq!(naming.extension(), "mkv");

        let naming = ClipNaming::for_input("out", "videos/source").unwrap();
        assert_eq!(naming.extension(), DEFAULT_EXTENSION);
    }
}
