//! Keyframe segmentation.
//!
//! [`segment`] makes a single forward pass over a frame sequence and builds a
//! [`ClipTable`] mapping each keyframe ordinal (the 1-based count of keyframes
//! seen so far) to the [`ClipDescriptor`] of the clip that keyframe closes.
//!
//! A clip starts at a keyframe and its `frame_count` is the number of
//! non-keyframes that followed before the next keyframe. When the stream ends
//! without a closing keyframe, a trailing flush records the open clip under
//! the current ordinal.
//!
//! # Example
//!
//! ```
//! use isplit::{Bounds, ClipDescriptor, segment};
//!
//! // K N N K N K N N N
//! let frames = [true, false, false, true, false, true, false, false, false];
//! let table = segment(frames, Bounds::default());
//!
//! assert_eq!(table.get(1), Some(&ClipDescriptor::new(0, 2)));
//! assert_eq!(table.get(2), Some(&ClipDescriptor::new(3, 1)));
//! assert_eq!(table.get(3), Some(&ClipDescriptor::new(5, 3)));
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::frame::Keyframe;

/// The frame range of a single output clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClipDescriptor {
    /// Frame ordinal of the first frame in the clip.
    pub start_index: u64,
    /// Number of frames in the clip.
    pub frame_count: u64,
}

impl ClipDescriptor {
    /// Create a descriptor.
    pub fn new(start_index: u64, frame_count: u64) -> Self {
        Self {
            start_index,
            frame_count,
        }
    }

    /// Returns `true` for a zero-length clip. Empty clips are never written.
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// One past the last frame of the clip.
    pub fn end_index(&self) -> u64 {
        self.start_index.saturating_add(self.frame_count)
    }
}

impl Display for ClipDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} frame(s) starting at frame {}",
            self.frame_count, self.start_index
        )
    }
}

/// Clip descriptors keyed by keyframe ordinal.
///
/// Iteration follows first-insertion order. Inserting an ordinal that is
/// already present replaces its descriptor in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipTable {
    entries: Vec<(u64, ClipDescriptor)>,
    // Ordinal -> position in `entries`.
    positions: HashMap<u64, usize>,
}

impl ClipTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Last write for a given ordinal wins.
    pub(crate) fn insert(&mut self, ordinal: u64, descriptor: ClipDescriptor) {
        match self.positions.get(&ordinal) {
            Some(&position) => self.entries[position].1 = descriptor,
            None => {
                self.positions.insert(ordinal, self.entries.len());
                self.entries.push((ordinal, descriptor));
            }
        }
    }

    /// Look up the descriptor stored for `ordinal`.
    pub fn get(&self, ordinal: u64) -> Option<&ClipDescriptor> {
        self.positions
            .get(&ordinal)
            .map(|&position| &self.entries[position].1)
    }

    /// Returns `true` if a descriptor is stored for `ordinal`.
    pub fn contains(&self, ordinal: u64) -> bool {
        self.get(ordinal).is_some()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no descriptors were produced.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(ordinal, descriptor)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ClipDescriptor)> + '_ {
        self.entries
            .iter()
            .map(|(ordinal, descriptor)| (*ordinal, descriptor))
    }

    /// The ordinals present in the table, in insertion order.
    pub fn ordinals(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(ordinal, _)| *ordinal)
    }

    /// Sum of the frame counts of every descriptor.
    pub fn total_frames(&self) -> u64 {
        self.entries
            .iter()
            .map(|(_, descriptor)| descriptor.frame_count)
            .sum()
    }
}

impl<'a> IntoIterator for &'a ClipTable {
    type Item = &'a (u64, ClipDescriptor);
    type IntoIter = std::slice::Iter<'a, (u64, ClipDescriptor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Display for ClipTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.entries.is_empty() {
            return writeln!(f, "No clips.");
        }
        for (ordinal, descriptor) in &self.entries {
            writeln!(f, "[{ordinal}] {descriptor}")?;
        }
        Ok(())
    }
}

/// Inclusive keyframe-ordinal range to keep.
///
/// Both bounds are 1-based. `None` means no limit on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// First keyframe ordinal to include.
    pub begin: Option<u64>,
    /// Last keyframe ordinal to include.
    pub end: Option<u64>,
}

impl Bounds {
    /// Build bounds from optional begin and end ordinals.
    pub fn new(begin: Option<u64>, end: Option<u64>) -> Self {
        Self { begin, end }
    }

    /// Keep clips from ordinal `begin` onwards.
    #[must_use]
    pub fn with_begin(mut self, begin: u64) -> Self {
        self.begin = Some(begin);
        self
    }

    /// Keep clips up to and including ordinal `end`.
    #[must_use]
    pub fn with_end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    /// Returns `true` if `ordinal` lies inside both bounds.
    pub fn contains(&self, ordinal: u64) -> bool {
        self.begin.is_none_or(|begin| ordinal >= begin) && self.end.is_none_or(|end| ordinal <= end)
    }

    fn is_before_begin(&self, ordinal: u64) -> bool {
        self.begin.is_some_and(|begin| ordinal < begin)
    }

    fn is_past_end(&self, ordinal: u64) -> bool {
        self.end.is_some_and(|end| ordinal > end)
    }
}

/// How the end-of-stream flush interacts with [`Bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingFlush {
    /// Always record the open clip when the stream ends on a non-keyframe,
    /// whatever the bounds say. This matches the long-standing behaviour of
    /// the tool and is the default.
    #[default]
    Unconditional,
    /// Drop the trailing clip when its ordinal falls outside the bounds.
    WithinBounds,
}

/// Settings for a segmentation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentOptions {
    /// Keyframe-ordinal range to keep.
    pub bounds: Bounds,
    /// Trailing flush policy.
    pub trailing_flush: TrailingFlush,
}

impl SegmentOptions {
    /// Default options: no bounds, unconditional trailing flush.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the pass to `bounds`.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Select the trailing flush policy.
    #[must_use]
    pub fn with_trailing_flush(mut self, trailing_flush: TrailingFlush) -> Self {
        self.trailing_flush = trailing_flush;
        self
    }
}

/// Segment `frames` into clips, keeping only those inside `bounds`.
///
/// Equivalent to [`segment_with_options`] with the default
/// [`TrailingFlush::Unconditional`] policy.
pub fn segment<I>(frames: I, bounds: Bounds) -> ClipTable
where
    I: IntoIterator,
    I::Item: Keyframe,
{
    segment_with_options(frames, &SegmentOptions::new().with_bounds(bounds))
}

/// Segment `frames` into clips.
///
/// Runs in a single pass with constant auxiliary state. Never fails:
/// inconsistent bounds such as `begin > end` simply produce an empty (or
/// nearly empty) table.
pub fn segment_with_options<I>(frames: I, options: &SegmentOptions) -> ClipTable
where
    I: IntoIterator,
    I::Item: Keyframe,
{
    let bounds = options.bounds;
    let mut table = ClipTable::new();

    let mut keyframe_ordinal: u64 = 0;
    let mut clip_start_index: u64 = 0;
    let mut frames_since_keyframe: u64 = 0;

    let mut frames = frames.into_iter().peekable();
    let mut index: u64 = 0;

    while let Some(frame) = frames.next() {
        let frame_index = index;
        index += 1;

        if frame.is_keyframe() {
            let iframe_index = frame_index;

            if bounds.is_before_begin(keyframe_ordinal) {
                log::trace!(
                    "Skipping clip {} (before begin ordinal {:?})",
                    keyframe_ordinal,
                    bounds.begin
                );
                frames_since_keyframe = 0;
                keyframe_ordinal += 1;
                clip_start_index = iframe_index;
                continue;
            }

            if bounds.is_past_end(keyframe_ordinal) {
                log::trace!(
                    "Stopping at keyframe {} (frame {}): past end ordinal {:?}",
                    keyframe_ordinal,
                    iframe_index,
                    bounds.end
                );
                break;
            }

            if keyframe_ordinal != 0 {
                log::debug!(
                    "Storing clip details: ordinal={}; index={}; frame_count={}",
                    keyframe_ordinal,
                    clip_start_index,
                    frames_since_keyframe
                );
                table.insert(
                    keyframe_ordinal,
                    ClipDescriptor::new(clip_start_index, frames_since_keyframe),
                );
            }

            frames_since_keyframe = 0;
            keyframe_ordinal += 1;
            clip_start_index = iframe_index;
        } else {
            frames_since_keyframe += 1;

            // No keyframe follows to close the open clip.
            if frames.peek().is_none() {
                if options.trailing_flush == TrailingFlush::WithinBounds
                    && !bounds.contains(keyframe_ordinal)
                {
                    log::trace!(
                        "Dropping trailing clip {} outside bounds {:?}",
                        keyframe_ordinal,
                        bounds
                    );
                    continue;
                }

                log::debug!(
                    "Storing trailing clip details: ordinal={}; index={}; frame_count={}",
                    keyframe_ordinal,
                    clip_start_index,
                    frames_since_keyframe
                );
                table.insert(
                    keyframe_ordinal,
                    ClipDescriptor::new(clip_start_index, frames_since_keyframe),
                );
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: bool = true;
    const N: bool = false;

    /// K N N K N K N N N
    fn scenario_a() -> Vec<bool> {
        vec![K, N, N, K, N, K, N, N, N]
    }

    fn entries(table: &ClipTable) -> Vec<(u64, u64, u64)> {
        table
            .iter()
            .map(|(ordinal, d)| (ordinal, d.start_index, d.frame_count))
            .collect()
    }

    #[test]
    fn unbounded_stream_ending_on_non_keyframe() {
        let table = segment(scenario_a(), Bounds::default());
        assert_eq!(entries(&table), vec![(1, 0, 2), (2, 3, 1), (3, 5, 3)]);
    }

    #[test]
    fn no_keyframes_flushes_under_ordinal_zero() {
        let table = segment([N; 5], Bounds::default());
        assert_eq!(entries(&table), vec![(0, 0, 5)]);
    }

    #[test]
    fn begin_discards_earlier_clips() {
        let table = segment(scenario_a(), Bounds::default().with_begin(2));
        assert_eq!(entries(&table), vec![(2, 3, 1), (3, 5, 3)]);
        assert!(!table.contains(1));
    }

    #[test]
    fn end_halts_the_pass() {
        let table = segment(scenario_a(), Bounds::default().with_end(1));
        assert_eq!(entries(&table), vec![(1, 0, 2)]);
    }

    #[test]
    fn trailing_keyframe_produces_no_flush() {
        let table = segment([K, N, N, K, N, K], Bounds::default());
        assert_eq!(entries(&table), vec![(1, 0, 2), (2, 3, 1)]);
    }

    #[test]
    fn single_keyframe_stream_is_empty() {
        assert!(segment([K], Bounds::default()).is_empty());
    }

    #[test]
    fn empty_stream_is_empty() {
        assert!(segment(Vec::<bool>::new(), Bounds::default()).is_empty());
    }

    #[test]
    fn consecutive_keyframes_emit_empty_clips() {
        let table = segment([K, K, K, N], Bounds::default());
        assert_eq!(entries(&table), vec![(1, 0, 0), (2, 1, 0), (3, 2, 1)]);
        assert!(table.get(1).is_some_and(ClipDescriptor::is_empty));
    }

    #[test]
    fn unconditional_flush_ignores_bounds() {
        // begin beyond the last keyframe: every boundary is skipped, but
        // the trailing clip is still recorded.
        let table = segment(scenario_a(), Bounds::default().with_begin(10));
        assert_eq!(entries(&table), vec![(3, 5, 3)]);
    }

    #[test]
    fn within_bounds_flush_respects_begin() {
        let options = SegmentOptions::new()
            .with_bounds(Bounds::default().with_begin(10))
            .with_trailing_flush(TrailingFlush::WithinBounds);
        assert!(segment_with_options(scenario_a(), &options).is_empty());
    }

    #[test]
    fn within_bounds_flush_respects_end() {
        // No boundary after ordinal 2 trips the stop rule, so the trailing
        // clip is recorded as ordinal 3 past the end bound.
        let frames = [K, N, K, N, K, N, N];
        let unconditional = segment(frames, Bounds::default().with_end(2));
        assert_eq!(
            entries(&unconditional),
            vec![(1, 0, 1), (2, 2, 1), (3, 4, 2)]
        );

        let frames = [K, N, K, N, N];
        let unconditional = segment(frames, Bounds::default().with_end(1));
        assert_eq!(entries(&unconditional), vec![(1, 0, 1), (2, 2, 2)]);

        let options = SegmentOptions::new()
            .with_bounds(Bounds::default().with_end(1))
            .with_trailing_flush(TrailingFlush::WithinBounds);
        let filtered = segment_with_options(frames, &options);
        assert_eq!(entries(&filtered), vec![(1, 0, 1)]);
    }

    #[test]
    fn inverted_bounds_are_not_an_error() {
        let options = SegmentOptions::new()
            .with_bounds(Bounds::new(Some(3), Some(1)))
            .with_trailing_flush(TrailingFlush::WithinBounds);
        assert!(segment_with_options(scenario_a(), &options).is_empty());
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut table = ClipTable::new();
        table.insert(1, ClipDescriptor::new(0, 2));
        table.insert(2, ClipDescriptor::new(3, 1));
        table.insert(1, ClipDescriptor::new(6, 3));

        assert_eq!(table.len(), 2);
        assert_eq!(table.ordinals().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(table.get(1), Some(&ClipDescriptor::new(6, 3)));
        assert_eq!(table.get(2), Some(&ClipDescriptor::new(3, 1)));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn all_keyframe_input_scales_linearly() {
        let frames = vec![K; 100_000];

        let started = std::time::Instant::now();
        let table = segment(&frames, Bounds::default());
        let elapsed = started.elapsed();

        // Every keyframe but the first closes a zero-length clip.
        assert_eq!(table.len(), 99_999);
        assert_eq!(table.get(99_999), Some(&ClipDescriptor::new(99_998, 0)));
        assert!(
            elapsed < std::time::Duration::from_secs(2),
            "segmenting 100k keyframes took {elapsed:?}"
        );
    }

    #[test]
    fn segmenting_twice_is_identical() {
        let bounds = Bounds::new(Some(1), Some(2));
        assert_eq!(segment(scenario_a(), bounds), segment(scenario_a(), bounds));
    }

    #[test]
    fn accepts_borrowed_frames() {
        let frames = scenario_a();
        let table = segment(&frames, Bounds::default());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn display_lists_clips() {
        let table = segment([K, N, K, N], Bounds::default());
        let text = table.to_string();
        assert!(text.contains("[1] 1 frame(s) starting at frame 0"));
        assert!(text.contains("[2] 1 frame(s) starting at frame 2"));
        assert_eq!(ClipTable::new().to_string(), "No clips.\n");
    }
}
