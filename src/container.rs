//! FFmpeg-backed frame source and clip writer.
//!
//! [`VideoPackets`] demuxes every packet of a file's best video stream into
//! memory without decoding; each packet is one frame whose keyframe flag
//! comes from the container. [`ContainerWriter`] muxes a contiguous slice of
//! those packets into a new file, copying the codec parameters, so clips are
//! cut without re-encoding. The output container is inferred from the
//! destination extension.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use isplit::{Bounds, ContainerWriter, FrameSource, SplitError, VideoPackets, segment};
//!
//! let packets = VideoPackets::open("input.avi")?;
//! let table = segment(packets.frames(), Bounds::default());
//!
//! let mut writer = ContainerWriter::new(&packets);
//! for (ordinal, descriptor) in table.iter() {
//!     let destination = format!("clip-{ordinal}.avi");
//!     isplit::extract_clip(&packets, &mut writer, descriptor, Path::new(&destination))?;
//! }
//! # Ok::<(), SplitError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{Id, Parameters},
    media::Type,
};

use crate::error::SplitError;
use crate::frame::{ClipSink, FrameSource, Keyframe};
use crate::options::SplitOptions;
use crate::progress::{OperationType, ProgressTracker};

/// One demuxed video packet.
#[derive(Clone)]
pub struct FramePacket {
    /// Position of the packet among the stream's packets (0-indexed).
    pub index: u64,
    /// Presentation timestamp in the stream time base, if present.
    pub pts: Option<i64>,
    /// Decoding timestamp in the stream time base, if present.
    pub dts: Option<i64>,
    /// Payload size in bytes.
    pub size: usize,
    /// Whether the container flags this packet as a sync point.
    pub is_keyframe: bool,
    packet: Packet,
}

impl Debug for FramePacket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FramePacket")
            .field("index", &self.index)
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("size", &self.size)
            .field("is_keyframe", &self.is_keyframe)
            .finish_non_exhaustive()
    }
}

impl Keyframe for FramePacket {
    fn is_keyframe(&self) -> bool {
        self.is_keyframe
    }
}

/// The video packets of one media file, held in memory.
pub struct VideoPackets {
    path: PathBuf,
    stream_index: usize,
    time_base: Rational,
    parameters: Parameters,
    frames: Vec<FramePacket>,
}

impl Debug for VideoPackets {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoPackets")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("time_base", &self.time_base)
            .field("codec", &self.codec_name())
            .field("frame_count", &self.frames.len())
            .finish_non_exhaustive()
    }
}

impl VideoPackets {
    /// Demux the best video stream of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::FileOpen`] if the file cannot be opened,
    /// [`SplitError::NoVideoStream`] if it has no video stream, or
    /// [`SplitError::FfmpegError`] if demuxing fails part-way.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        Self::open_with_options(path, &SplitOptions::default())
    }

    /// Like [`open`](VideoPackets::open), reporting demux progress to the
    /// options' callback.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: &SplitOptions,
    ) -> Result<Self, SplitError> {
        let path = path.as_ref().to_path_buf();
        log::info!("Opening file {}...", path.display());

        ffmpeg_next::init().map_err(|error| SplitError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let mut input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SplitError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let (stream_index, time_base, parameters, estimated_frames) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(SplitError::NoVideoStream)?;
            let estimated_frames = Some(stream.frames())
                .filter(|&frames| frames > 0)
                .map(|frames| frames as u64);
            (
                stream.index(),
                stream.time_base(),
                stream.parameters().clone(),
                estimated_frames,
            )
        };

        log::debug!(
            "Demuxing video stream {} ({}, time base {}/{})",
            stream_index,
            parameters.id().name(),
            time_base.numerator(),
            time_base.denominator()
        );

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Demuxing,
            estimated_frames,
            options.batch_size,
        );

        let mut frames: Vec<FramePacket> = Vec::new();
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut input_context) {
                Ok(()) => {
                    if packet.stream() != stream_index {
                        continue;
                    }

                    let index = frames.len() as u64;
                    frames.push(FramePacket {
                        index,
                        pts: packet.pts(),
                        dts: packet.dts(),
                        size: packet.size(),
                        is_keyframe: packet.is_key(),
                        packet,
                    });
                    tracker.advance(None);
                }
                Err(FfmpegError::Eof) => break,
                Err(error) => return Err(SplitError::from(error)),
            }
        }
        tracker.finish();

        log::info!("Opened {} ({} video packets)", path.display(), frames.len());

        Ok(Self {
            path,
            stream_index,
            time_base,
            parameters,
            frames,
        })
    }

    /// Path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the demuxed stream within the source container.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Time base of the demuxed stream.
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Short name of the stream's codec (e.g. `mpeg4`).
    pub fn codec_name(&self) -> &'static str {
        self.parameters.id().name()
    }

    /// Number of keyframe packets.
    pub fn keyframe_count(&self) -> u64 {
        self.frames.iter().filter(|frame| frame.is_keyframe).count() as u64
    }
}

impl FrameSource for VideoPackets {
    type Frame = FramePacket;

    fn frames(&self) -> &[FramePacket] {
        &self.frames
    }
}

/// Writes packet slices of a [`VideoPackets`] source to new container files.
///
/// Each clip gets a single video stream with the source's codec parameters.
/// Timestamps are shifted so every clip starts at zero.
pub struct ContainerWriter {
    parameters: Parameters,
    time_base: Rational,
    overwrite: bool,
}

impl ContainerWriter {
    /// Create a writer for clips cut from `source`.
    pub fn new(source: &VideoPackets) -> Self {
        Self {
            parameters: source.parameters.clone(),
            time_base: source.time_base,
            overwrite: false,
        }
    }

    /// Allow replacing existing files. Defaults to `false`.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn mux(&self, frames: &[FramePacket], destination: &Path) -> Result<(), FfmpegError> {
        let mut output_context = ffmpeg_next::format::output(destination)?;

        {
            let mut output_stream = output_context.add_stream(ffmpeg_next::encoder::find(Id::None))?;
            output_stream.set_parameters(self.parameters.clone());
            output_stream.set_time_base(self.time_base);
            // Let the muxer pick a codec tag valid for the new container.
            unsafe {
                (*output_stream.parameters().as_mut_ptr()).codec_tag = 0;
            }
        }

        output_context.write_header()?;

        let output_time_base = output_context
            .stream(0)
            .map(|stream| stream.time_base())
            .unwrap_or(self.time_base);
        let origin = frames
            .iter()
            .filter_map(|frame| frame.dts.or(frame.pts))
            .min()
            .unwrap_or(0);

        for frame in frames {
            let mut packet = frame.packet.clone();
            packet.set_stream(0);
            packet.set_pts(frame.pts.map(|pts| pts - origin));
            packet.set_dts(frame.dts.map(|dts| dts - origin));
            packet.rescale_ts(self.time_base, output_time_base);
            packet.set_position(-1);
            packet.write_interleaved(&mut output_context)?;
        }

        output_context.write_trailer()?;
        Ok(())
    }
}

impl ClipSink<FramePacket> for ContainerWriter {
    fn write_clip(&mut self, frames: &[FramePacket], destination: &Path) -> Result<(), SplitError> {
        let clip_write_error = |reason: String| SplitError::ClipWrite {
            path: destination.to_path_buf(),
            reason,
        };

        if destination.exists() && !self.overwrite {
            return Err(clip_write_error("file already exists".to_string()));
        }

        if let Some(parent) = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|error| clip_write_error(error.to_string()))?;
        }

        log::debug!("Outputting {}", destination.display());
        self.mux(frames, destination).map_err(|error| {
            // Never leave a partial clip behind.
            if destination.exists()
                && let Err(remove_error) = fs::remove_file(destination)
            {
                log::warn!(
                    "Could not remove partial clip {}: {}",
                    destination.display(),
                    remove_error
                );
            }
            clip_write_error(error.to_string())
        })
    }
}
