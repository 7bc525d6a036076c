//! Frame abstractions shared by the segmenter and the clip extractor.
//!
//! The core never looks inside a frame. It only needs to know whether a frame
//! is a keyframe ([`Keyframe`]), how to take a contiguous slice of the whole
//! sequence ([`FrameSource`]), and where to hand that slice for writing
//! ([`ClipSink`]).
//!
//! # Example
//!
//! ```
//! use isplit::{FrameList, FrameSource};
//!
//! let source = FrameList::new(vec![true, false, false, true, false]);
//! assert_eq!(source.frame_count(), 5);
//! assert_eq!(source.slice(3, 2), Some(&[true, false][..]));
//! assert_eq!(source.slice(4, 2), None);
//! ```

use std::path::Path;

use crate::error::SplitError;

/// A unit of the input sequence that can report whether it is a keyframe.
pub trait Keyframe {
    /// Returns `true` if the frame can be decoded without reference to
    /// preceding frames.
    fn is_keyframe(&self) -> bool;
}

impl Keyframe for bool {
    fn is_keyframe(&self) -> bool {
        *self
    }
}

impl<T: Keyframe + ?Sized> Keyframe for &T {
    fn is_keyframe(&self) -> bool {
        (**self).is_keyframe()
    }
}

/// An ordered, random-access frame sequence.
///
/// The sequence is treated as read-only for the lifetime of a split
/// operation.
pub trait FrameSource {
    /// The frame type held by the source.
    type Frame: Keyframe;

    /// All frames, in stream order.
    fn frames(&self) -> &[Self::Frame];

    /// Total number of frames in the source.
    fn frame_count(&self) -> u64 {
        self.frames().len() as u64
    }

    /// Borrow `frame_count` frames starting at `start_index`.
    ///
    /// Returns `None` if the requested range extends past the end of the
    /// source.
    fn slice(&self, start_index: u64, frame_count: u64) -> Option<&[Self::Frame]> {
        let start = usize::try_from(start_index).ok()?;
        let count = usize::try_from(frame_count).ok()?;
        let end = start.checked_add(count)?;
        self.frames().get(start..end)
    }
}

/// Destination for extracted clips.
///
/// Implementations perform the container-format write. The frames passed in
/// are always a contiguous slice of a [`FrameSource`].
pub trait ClipSink<F> {
    /// Persist `frames` to `destination`.
    fn write_clip(&mut self, frames: &[F], destination: &Path) -> Result<(), SplitError>;
}

/// A [`FrameSource`] backed by an in-memory vector.
///
/// Useful for driving the segmenter from keyframe flags obtained elsewhere,
/// and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameList<F> {
    frames: Vec<F>,
}

impl<F: Keyframe> FrameList<F> {
    /// Wrap an existing frame vector.
    pub fn new(frames: Vec<F>) -> Self {
        Self { frames }
    }

    /// Number of keyframes in the list.
    pub fn keyframe_count(&self) -> u64 {
        self.frames.iter().filter(|frame| frame.is_keyframe()).count() as u64
    }

    /// Consume the list, returning the underlying frames.
    pub fn into_inner(self) -> Vec<F> {
        self.frames
    }
}

impl<F: Keyframe> FromIterator<F> for FrameList<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<F: Keyframe> FrameSource for FrameList<F> {
    type Frame = F;

    fn frames(&self) -> &[F] {
        &self.frames
    }
}
