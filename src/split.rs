//! Running extraction over a whole clip table.
//!
//! [`Splitter`] takes a [`ClipTable`] produced by the segmenter and writes one
//! clip per entry, in table order, through a [`ClipSink`]. [`split_file`]
//! wires the full pipeline together for a file on disk: demux, segment,
//! write.
//!
//! # Example
//!
//! ```no_run
//! use isplit::{Bounds, ClipNaming, SplitError, SplitOptions};
//!
//! let naming = ClipNaming::for_input("clips/out", "input.avi")?;
//! let options = SplitOptions::new().with_bounds(Bounds::new(Some(3), Some(6)));
//! let report = isplit::split_file("input.avi", &naming, &options)?;
//! print!("{report}");
//! # Ok::<(), SplitError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use crate::clip::{ClipNaming, extract_clip};
use crate::container::{ContainerWriter, VideoPackets};
use crate::error::SplitError;
use crate::frame::{ClipSink, FrameSource};
use crate::options::{FailurePolicy, SplitOptions};
use crate::progress::{OperationType, ProgressTracker};
use crate::segment::{ClipDescriptor, ClipTable, segment_with_options};

/// A clip that was written successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenClip {
    /// Keyframe ordinal of the clip.
    pub ordinal: u64,
    /// Where the clip was written.
    pub path: PathBuf,
    /// The frame range that was written.
    pub descriptor: ClipDescriptor,
}

/// A clip that failed under [`FailurePolicy::Continue`].
#[derive(Debug)]
pub struct FailedClip {
    /// Keyframe ordinal of the clip.
    pub ordinal: u64,
    /// The destination that could not be written.
    pub path: PathBuf,
    /// Why it failed.
    pub error: SplitError,
}

/// Outcome of a split.
#[derive(Debug, Default)]
pub struct SplitReport {
    /// Clips written, in table order.
    pub written: Vec<WrittenClip>,
    /// Ordinals of empty clips that were not written.
    pub skipped: Vec<u64>,
    /// Clips that failed. Only populated under [`FailurePolicy::Continue`].
    pub failed: Vec<FailedClip>,
}

impl SplitReport {
    /// Returns `true` if no clip failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of frames written across all clips.
    pub fn frames_written(&self) -> u64 {
        self.written
            .iter()
            .map(|clip| clip.descriptor.frame_count)
            .sum()
    }
}

impl Display for SplitReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for clip in &self.written {
            writeln!(
                f,
                "[OK] clip {} -> {} ({})",
                clip.ordinal,
                clip.path.display(),
                clip.descriptor
            )?;
        }
        for ordinal in &self.skipped {
            writeln!(f, "[SKIP] clip {ordinal} is empty")?;
        }
        for clip in &self.failed {
            writeln!(
                f,
                "[ERROR] clip {} -> {}: {}",
                clip.ordinal,
                clip.path.display(),
                clip.error
            )?;
        }
        writeln!(
            f,
            "{} written, {} skipped, {} failed",
            self.written.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Writes every clip of a [`ClipTable`].
#[derive(Debug, Clone)]
pub struct Splitter {
    naming: ClipNaming,
    options: SplitOptions,
}

impl Splitter {
    /// Create a splitter with default options.
    pub fn new(naming: ClipNaming) -> Self {
        Self {
            naming,
            options: SplitOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    /// The naming scheme used for destinations.
    pub fn naming(&self) -> &ClipNaming {
        &self.naming
    }

    /// Extract every clip in `table` from `source` into `sink`.
    ///
    /// Clips are written in table order. Empty clips are skipped. The
    /// cancellation token is checked before each clip.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::Cancelled`] if cancellation is requested, or
    /// [`SplitError::ClipFailed`] for the first failing clip under
    /// [`FailurePolicy::Halt`].
    pub fn run<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        table: &ClipTable,
    ) -> Result<SplitReport, SplitError>
    where
        S: FrameSource + ?Sized,
        K: ClipSink<S::Frame> + ?Sized,
    {
        let mut report = SplitReport::default();
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::ClipExtraction,
            Some(table.len() as u64),
            self.options.batch_size,
        );

        for (ordinal, descriptor) in table.iter() {
            if self.options.is_cancelled() {
                log::info!("Split cancelled before clip {ordinal}");
                return Err(SplitError::Cancelled);
            }

            let path = self.naming.path_for(ordinal);

            if descriptor.is_empty() {
                log::warn!("Skipping empty clip {ordinal} ({})", path.display());
                report.skipped.push(ordinal);
                tracker.advance(Some(ordinal));
                continue;
            }

            match extract_clip(source, &mut *sink, descriptor, &path) {
                Ok(()) => {
                    log::info!("Wrote clip {ordinal} to {}", path.display());
                    report.written.push(WrittenClip {
                        ordinal,
                        path,
                        descriptor: *descriptor,
                    });
                }
                Err(error) => match self.options.failure_policy {
                    FailurePolicy::Halt => {
                        return Err(SplitError::ClipFailed {
                            ordinal,
                            path,
                            source: Box::new(error),
                        });
                    }
                    FailurePolicy::Continue => {
                        log::warn!("Clip {ordinal} ({}) failed: {error}", path.display());
                        report.failed.push(FailedClip {
                            ordinal,
                            path,
                            error,
                        });
                    }
                },
            }

            tracker.advance(Some(ordinal));
        }

        tracker.finish();
        Ok(report)
    }
}

/// Split the video file at `input` into clips named by `naming`.
///
/// Demuxes the best video stream into memory, segments it with the options'
/// bounds and trailing flush policy, then writes each clip without
/// re-encoding.
///
/// # Errors
///
/// Returns [`SplitError::FileOpen`] or [`SplitError::NoVideoStream`] if the
/// input cannot be read, and any error [`Splitter::run`] returns.
pub fn split_file<P: AsRef<Path>>(
    input: P,
    naming: &ClipNaming,
    options: &SplitOptions,
) -> Result<SplitReport, SplitError> {
    let packets = VideoPackets::open_with_options(input, options)?;
    let table = segment_with_options(packets.frames(), options.segment_options());
    log::info!(
        "Found {} keyframe(s) in {} frame(s); {} clip(s) to write",
        packets.keyframe_count(),
        packets.frame_count(),
        table.len()
    );

    let mut writer = ContainerWriter::new(&packets).with_overwrite(options.overwrite);
    Splitter::new(naming.clone())
        .with_options(options.clone())
        .run(&packets, &mut writer, &table)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::frame::FrameList;
    use crate::progress::{CancellationToken, ProgressCallback, ProgressInfo};
    use crate::segment::{Bounds, segment};

    const K: bool = true;
    const N: bool = false;

    #[derive(Default)]
    struct MemorySink {
        clips: Vec<(PathBuf, Vec<bool>)>,
        fail_on: Vec<PathBuf>,
    }

    impl ClipSink<bool> for MemorySink {
        fn write_clip(&mut self, frames: &[bool], destination: &Path) -> Result<(), SplitError> {
            if self.fail_on.iter().any(|path| path == destination) {
                return Err(SplitError::ClipWrite {
                    path: destination.to_path_buf(),
                    reason: "disk full".to_string(),
                });
            }
            self.clips.push((destination.to_path_buf(), frames.to_vec()));
            Ok(())
        }
    }

    fn naming() -> ClipNaming {
        ClipNaming::new("out", "avi").unwrap()
    }

    fn source() -> FrameList<bool> {
        FrameList::new(vec![K, N, N, K, N, K, N, N, N])
    }

    #[test]
    fn writes_clips_in_table_order() {
        let source = source();
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink::default();

        let report = Splitter::new(naming()).run(&source, &mut sink, &table).unwrap();

        let paths: Vec<_> = sink.clips.iter().map(|(path, _)| path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out-1.avi"),
                PathBuf::from("out-2.avi"),
                PathBuf::from("out-3.avi"),
            ]
        );
        assert_eq!(sink.clips[0].1, vec![K, N]);
        assert_eq!(sink.clips[1].1, vec![K]);
        assert_eq!(sink.clips[2].1, vec![K, N, N]);
        assert!(report.is_success());
        assert_eq!(report.frames_written(), 6);
    }

    #[test]
    fn empty_clips_are_skipped() {
        let source = FrameList::new(vec![K, K, N]);
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink::default();

        let report = Splitter::new(naming()).run(&source, &mut sink, &table).unwrap();

        assert_eq!(report.skipped, vec![1]);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].ordinal, 2);
    }

    #[test]
    fn halt_policy_stops_at_first_failure() {
        let source = source();
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink {
            fail_on: vec![PathBuf::from("out-2.avi")],
            ..MemorySink::default()
        };

        let error = Splitter::new(naming())
            .run(&source, &mut sink, &table)
            .unwrap_err();

        match error {
            SplitError::ClipFailed { ordinal, path, .. } => {
                assert_eq!(ordinal, 2);
                assert_eq!(path, PathBuf::from("out-2.avi"));
            }
            other => panic!("Expected ClipFailed, got: {other}"),
        }
        assert_eq!(sink.clips.len(), 1);
    }

    #[test]
    fn continue_policy_records_failures() {
        let source = source();
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink {
            fail_on: vec![PathBuf::from("out-2.avi")],
            ..MemorySink::default()
        };

        let report = Splitter::new(naming())
            .with_options(SplitOptions::new().with_failure_policy(FailurePolicy::Continue))
            .run(&source, &mut sink, &table)
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].ordinal, 2);
        assert_eq!(report.written.len(), 2);
        assert!(report.to_string().contains("2 written, 0 skipped, 1 failed"));
    }

    #[test]
    fn cancellation_stops_before_next_clip() {
        let source = source();
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink::default();
        let token = CancellationToken::new();
        token.cancel();

        let result = Splitter::new(naming())
            .with_options(SplitOptions::new().with_cancellation(token))
            .run(&source, &mut sink, &table);

        assert!(matches!(result, Err(SplitError::Cancelled)));
        assert!(sink.clips.is_empty());
    }

    #[test]
    fn out_of_range_table_entry_surfaces_clip_context() {
        let source = FrameList::new(vec![K, N]);
        let table = segment([K, N, N, N], Bounds::default());
        let mut sink = MemorySink::default();

        let error = Splitter::new(naming())
            .run(&source, &mut sink, &table)
            .unwrap_err();

        match error {
            SplitError::ClipFailed { ordinal, source, .. } => {
                assert_eq!(ordinal, 1);
                assert!(matches!(*source, SplitError::ClipOutOfRange { .. }));
            }
            other => panic!("Expected ClipFailed, got: {other}"),
        }
    }

    struct Recorder(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn progress_counts_clips() {
        let source = source();
        let table = segment(source.frames(), Bounds::default());
        let mut sink = MemorySink::default();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));

        Splitter::new(naming())
            .with_options(SplitOptions::new().with_progress(recorder.clone()))
            .run(&source, &mut sink, &table)
            .unwrap();

        let infos = recorder.0.lock().unwrap();
        assert_eq!(infos.len(), 3);
        assert!(
            infos
                .iter()
                .all(|info| info.operation == OperationType::ClipExtraction)
        );
        assert_eq!(infos[2].current_clip, Some(3));
        assert_eq!(infos[2].total, Some(3));
    }
}
