//! Split configuration.
//!
//! [`SplitOptions`] is a builder that threads the segmentation settings,
//! progress callbacks, cancellation tokens, and failure policy through a
//! split without polluting every function signature.
//!
//! # Example
//!
//! ```
//! use isplit::{Bounds, CancellationToken, FailurePolicy, SplitOptions, TrailingFlush};
//!
//! let token = CancellationToken::new();
//! let options = SplitOptions::new()
//!     .with_bounds(Bounds::new(Some(2), Some(8)))
//!     .with_trailing_flush(TrailingFlush::WithinBounds)
//!     .with_failure_policy(FailurePolicy::Continue)
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::segment::{Bounds, SegmentOptions, TrailingFlush};

/// What to do when one clip fails to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing clip and return its error.
    #[default]
    Halt,
    /// Record the failure and carry on with the remaining clips.
    Continue,
}

/// Configuration for a split operation.
///
/// A default-constructed value keeps every clip, halts on the first failure,
/// never overwrites existing files, and reports no progress.
#[derive(Clone)]
pub struct SplitOptions {
    pub(crate) segment: SegmentOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) overwrite: bool,
}

impl Debug for SplitOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SplitOptions")
            .field("segment", &self.segment)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("failure_policy", &self.failure_policy)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            segment: SegmentOptions::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            failure_policy: FailurePolicy::default(),
            overwrite: false,
        }
    }

    /// Restrict splitting to a keyframe-ordinal range.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.segment.bounds = bounds;
        self
    }

    /// Select how the end-of-stream clip interacts with the bounds.
    #[must_use]
    pub fn with_trailing_flush(mut self, trailing_flush: TrailingFlush) -> Self {
        self.segment.trailing_flush = trailing_flush;
        self
    }

    /// Replace the segmentation settings wholesale.
    #[must_use]
    pub fn with_segment_options(mut self, segment: SegmentOptions) -> Self {
        self.segment = segment;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each clip.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Choose between halting and continuing after a failed clip.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Allow replacing existing output files.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The segmentation settings.
    pub fn segment_options(&self) -> &SegmentOptions {
        &self.segment
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
