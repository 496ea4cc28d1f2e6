//! Video Source: owns the decoder and all mutable playback state, per
//! `spec.md` §4.3. Grounded on the shared-owner shape of
//! `examples/starpact-tlc/src-tauri/src/handler.rs`'s `TLCHandler` (state
//! behind a lock, mutated only through method calls that also drive a
//! side effect like re-reading the video), but rewritten around a single
//! decoder + LRU cache instead of a config/data split.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use vts_format::{Colorspace, OutputFormat, Rational, VideoStandard};

use crate::cache::{CacheKey, FrameCache};
use crate::decoder::Decoder;
use crate::error::VtsError;

const RECOGNIZED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "m4v", "webm"];

/// Flag bits of the 16-byte frame header, per `spec.md` §6.2.
pub mod flags {
    pub const KEYFRAME: u8 = 1 << 0;
    pub const FIELD_1: u8 = 1 << 1;
    pub const FIELD_2: u8 = 1 << 2;
    pub const END_OF_STREAM: u8 = 1 << 3;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub sequence: u32,
    pub timestamp_ms: u32,
    pub width: u32,
    pub height: u32,
    pub colorspace: Colorspace,
    pub flags: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub codec: String,
}

impl SourceInfo {
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 * self.frame_rate.den as f64 / self.frame_rate.num as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn name(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "STOPPED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Frame(usize),
    End,
    Start,
}

pub struct LoadResult {
    pub frame_count: usize,
}

pub struct VideoSource {
    decoder: Option<Decoder>,
    source_info: Option<SourceInfo>,
    cache: FrameCache,
    output_format: OutputFormat,
    current_frame: usize,
    loop_mode: bool,
    playback_state: PlaybackState,
}

impl VideoSource {
    pub fn new(cache_capacity: usize) -> Self {
        VideoSource {
            decoder: None,
            source_info: None,
            cache: FrameCache::new(cache_capacity),
            output_format: OutputFormat::default(),
            current_frame: 0,
            loop_mode: false,
            playback_state: PlaybackState::Stopped,
        }
    }

    #[instrument(skip(self), fields(path = %path.display()), err)]
    pub fn load(&mut self, path: &Path) -> Result<LoadResult, VtsError> {
        if !path.exists() {
            return Err(VtsError::FileNotFound(path.display().to_string()));
        }

        let decoder = Decoder::open(path)
            .map_err(|e| VtsError::InternalError(format!("failed to open {}: {e}", path.display())))?;
        let meta = decoder.meta().clone();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        self.decoder = Some(decoder);
        self.source_info = Some(SourceInfo {
            path: canonical,
            frame_count: meta.frame_count,
            width: meta.width,
            height: meta.height,
            frame_rate: Rational::new(meta.frame_rate.num as u32, meta.frame_rate.den as u32),
            codec: meta.codec_name,
        });
        self.current_frame = 0;
        self.cache.clear();
        self.playback_state = PlaybackState::Stopped;

        Ok(LoadResult {
            frame_count: meta.frame_count,
        })
    }

    /// Non-recursive directory listing, sorted case-insensitively, per
    /// `spec.md` §4.3. `dir` defaults to the current working directory
    /// when omitted (the open question in `spec.md` §9 resolved this way;
    /// see `DESIGN.md`).
    pub fn list(&self, dir: Option<&Path>) -> Result<Vec<String>, VtsError> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => std::env::current_dir()
                .map_err(|e| VtsError::InternalError(e.to_string()))?,
        };

        let entries = std::fs::read_dir(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VtsError::FileNotFound(dir.display().to_string())
            } else {
                VtsError::InternalError(e.to_string())
            }
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VtsError::InternalError(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_recognized = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| RECOGNIZED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_recognized {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort_by_key(|n| n.to_ascii_lowercase());
        Ok(names)
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.source_info.as_ref()
    }

    /// Resolves an optional requested key against `CurrentFrame` and
    /// `LoopMode`, per `spec.md` §4.3.
    fn resolve_key(&self, key: Option<usize>, frame_count: usize) -> Result<usize, VtsError> {
        let key = key.unwrap_or(self.current_frame);
        if key < frame_count {
            return Ok(key);
        }
        if self.loop_mode && frame_count > 0 {
            Ok(key % frame_count)
        } else {
            Err(VtsError::InvalidArgument(format!(
                "frame {key} out of range [0, {frame_count})"
            )))
        }
    }

    fn require_source(&self) -> Result<&SourceInfo, VtsError> {
        self.source_info.as_ref().ok_or(VtsError::NotLoaded)
    }

    #[instrument(skip(self), err)]
    pub fn get_frame(&mut self, key: Option<usize>) -> Result<std::sync::Arc<FrameBuffer>, VtsError> {
        let info = self.require_source()?.clone();
        let key = self.resolve_key(key, info.frame_count)?;

        let cache_key: CacheKey = (key, self.output_format.standard, self.output_format.colorspace);
        self.current_frame = key;

        if let Some(hit) = self.cache.get(&cache_key) {
            debug!(key, "frame cache hit");
            return Ok(hit);
        }

        let (w, h) = self.output_format.geometry();
        let decoder = self.decoder.as_mut().ok_or(VtsError::NotLoaded)?;
        let (rgb, is_key) = decoder
            .decode_frame(key, w, h)
            .map_err(|e| VtsError::InternalError(e.to_string()))?;
        let payload = vts_colorspace::convert(&rgb, w, h, self.output_format.colorspace)?;

        // Truncating integer division, not rounding: `spec.md` §8's worked
        // example (frame 299 of a 300-frame 30fps source) expects 9966, the
        // floor of 299 * 1000 / 30, not the nearest-rounded 9967.
        let timestamp_ms =
            (key as u64 * 1000 * info.frame_rate.den as u64 / info.frame_rate.num as u64) as u32;
        let mut flags = 0u8;
        if is_key {
            flags |= flags::KEYFRAME;
        }
        if key + 1 == info.frame_count {
            flags |= flags::END_OF_STREAM;
        }

        let frame = std::sync::Arc::new(FrameBuffer {
            sequence: key as u32,
            timestamp_ms,
            width: w,
            height: h,
            colorspace: self.output_format.colorspace,
            flags,
            payload,
        });
        self.cache.put(cache_key, frame.clone());
        Ok(frame)
    }

    /// Same metadata as `get_frame`, without requiring the payload to be
    /// materialized twice by the caller; internally this still decodes
    /// and may populate the cache, which `spec.md` §4.3 permits.
    pub fn frame_info(&mut self, key: Option<usize>) -> Result<std::sync::Arc<FrameBuffer>, VtsError> {
        self.get_frame(key)
    }

    pub fn seek(&mut self, key: usize) -> Result<usize, VtsError> {
        let frame_count = self.require_source()?.frame_count;
        let key = self.resolve_key(Some(key), frame_count)?;
        self.current_frame = key;
        Ok(key)
    }

    pub fn next(&mut self) -> Result<StepOutcome, VtsError> {
        let frame_count = self.require_source()?.frame_count;
        if self.current_frame + 1 >= frame_count {
            if self.loop_mode {
                self.current_frame = 0;
                Ok(StepOutcome::Frame(0))
            } else {
                Ok(StepOutcome::End)
            }
        } else {
            self.current_frame += 1;
            Ok(StepOutcome::Frame(self.current_frame))
        }
    }

    pub fn prev(&mut self) -> Result<StepOutcome, VtsError> {
        let frame_count = self.require_source()?.frame_count;
        if self.current_frame == 0 {
            if self.loop_mode && frame_count > 0 {
                self.current_frame = frame_count - 1;
                Ok(StepOutcome::Frame(self.current_frame))
            } else {
                Ok(StepOutcome::Start)
            }
        } else {
            self.current_frame -= 1;
            Ok(StepOutcome::Frame(self.current_frame))
        }
    }

    pub fn play(&mut self) -> Result<PlaybackState, VtsError> {
        self.require_source()?;
        self.playback_state = PlaybackState::Playing;
        Ok(self.playback_state)
    }

    pub fn pause(&mut self) -> Result<PlaybackState, VtsError> {
        self.require_source()?;
        self.playback_state = PlaybackState::Paused;
        Ok(self.playback_state)
    }

    pub fn stop(&mut self) -> Result<PlaybackState, VtsError> {
        self.require_source()?;
        self.playback_state = PlaybackState::Stopped;
        self.current_frame = 0;
        Ok(self.playback_state)
    }

    pub fn set_format(&mut self, standard: VideoStandard, colorspace: Colorspace) {
        self.output_format = OutputFormat { standard, colorspace };
        self.cache.clear();
    }

    pub fn format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn set_loop(&mut self, flag: bool) {
        self.loop_mode = flag;
    }

    pub fn loop_mode(&self) -> bool {
        self.loop_mode
    }

    pub fn status(&self) -> (PlaybackState, usize, usize) {
        let total = self.source_info.as_ref().map(|i| i.frame_count).unwrap_or(0);
        (self.playback_state, self.current_frame, total)
    }

    pub fn close(&mut self) {
        if self.decoder.is_none() {
            return;
        }
        warn!("closing video source");
        self.decoder = None;
        self.source_info = None;
        self.cache.clear();
        self.current_frame = 0;
        self.playback_state = PlaybackState::Stopped;
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.close();
    }
}
