//! Decoder wrapper: owns the ffmpeg decode context for one open file,
//! seeks to the nearest preceding keyframe and decodes forward to reach a
//! requested frame index, then scales to the requested output geometry.
//!
//! Grounded in `examples/starpact-tlc/tlc-core/src/video/decode.rs`'s
//! `Decoder` (codec context + reusable scaling context + reusable
//! src/dst frame buffers, wrapped `Send` via a newtype because
//! `scaling::Context` holds a raw pointer). That teacher code only ever
//! scales in place on an already-ordered packet stream; the seek path
//! below is new, built directly on `ffmpeg-next`'s `Input::seek`.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ffmpeg::format::Pixel;
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::scaling::{self, flag::Flags};
use ffmpeg::util::frame::video::Video;

/// Wrap `scaling::Context` to move it across threads; it embeds a raw
/// pointer to the underlying `SwsContext`.
struct SendableSws(scaling::Context);

#[allow(clippy::non_send_fields_in_send_ty)]
unsafe impl Send for SendableSws {}

impl Deref for SendableSws {
    type Target = scaling::Context;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SendableSws {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

#[derive(Debug, Clone)]
pub struct VideoMeta {
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub codec_name: String,
}

/// pts -> frame index, the inverse of `pts_for_frame` below.
fn frame_index_of(pts: i64, time_base: Rational, fps: Rational) -> i64 {
    (pts * time_base.num as i64 * fps.num as i64) / (time_base.den as i64 * fps.den as i64)
}

fn pts_for_frame(frame_index: i64, time_base: Rational, fps: Rational) -> i64 {
    (frame_index * time_base.den as i64 * fps.den as i64) / (time_base.num as i64 * fps.num as i64)
}

pub struct Decoder {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    codec_ctx: ffmpeg::decoder::Video,
    time_base: Rational,
    fps: Rational,
    meta: VideoMeta,
    sws: Option<(u32, u32, SendableSws)>,
    src_frame: Video,
    dst_frame: Video,
    /// Frame index of the most recently decoded frame, used to skip a
    /// reseek when the next request is sequential.
    last_index: Option<i64>,
}

impl Decoder {
    pub fn open(path: &Path) -> Result<Self> {
        let input = ffmpeg::format::input(&path).context("failed to open/probe input")?;
        let stream = input
            .streams()
            .best(MediaType::Video)
            .ok_or_else(|| anyhow!("no video stream found"))?;
        let stream_index = stream.index();
        let parameters = stream.parameters();
        let avg = stream.avg_frame_rate();
        let fps = Rational {
            num: avg.numerator().max(1),
            den: avg.denominator().max(1),
        };
        let tb = stream.time_base();
        let time_base = Rational {
            num: tb.numerator(),
            den: tb.denominator(),
        };
        let frame_count = stream.frames().max(0) as usize;

        let codec_ctx = ffmpeg::codec::Context::from_parameters(parameters)
            .context("failed to build codec context")?
            .decoder()
            .video()
            .context("failed to open video decoder")?;

        let codec_name = codec_ctx.id().name().to_owned();
        let width = codec_ctx.width();
        let height = codec_ctx.height();

        drop(stream);

        Ok(Decoder {
            input,
            stream_index,
            codec_ctx,
            time_base,
            fps,
            meta: VideoMeta {
                frame_count,
                width,
                height,
                frame_rate: fps,
                codec_name,
            },
            sws: None,
            src_frame: Video::empty(),
            dst_frame: Video::empty(),
            last_index: None,
        })
    }

    pub fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    /// Decodes `frame_index`, scales to `(dst_w, dst_h)` and converts to
    /// RGB24, per `spec.md` §4.3's seek-decode policy. Returns the RGB24
    /// payload and whether the decoded frame was a keyframe.
    pub fn decode_frame(
        &mut self,
        frame_index: usize,
        dst_w: u32,
        dst_h: u32,
    ) -> Result<(Vec<u8>, bool)> {
        let target = frame_index as i64;

        let sequential = self.last_index == Some(target - 1);
        if !sequential {
            self.seek_to(target)?;
        }

        let (frame, is_key) = self.decode_until(target)?;
        self.last_index = Some(target);

        self.ensure_sws(dst_w, dst_h)?;
        let sws = self
            .sws
            .as_mut()
            .map(|(_, _, ctx)| ctx)
            .expect("sws context initialized above");
        sws.run(&frame, &mut self.dst_frame)
            .context("failed to scale/convert decoded frame")?;

        let stride = self.dst_frame.stride(0);
        let row_bytes = dst_w as usize * 3;
        let mut out = Vec::with_capacity(row_bytes * dst_h as usize);
        let data = self.dst_frame.data(0);
        for row in 0..dst_h as usize {
            let start = row * stride;
            out.extend_from_slice(&data[start..start + row_bytes]);
        }
        Ok((out, is_key))
    }

    fn ensure_sws(&mut self, dst_w: u32, dst_h: u32) -> Result<()> {
        let needs_rebuild = match &self.sws {
            Some((w, h, _)) => *w != dst_w || *h != dst_h,
            None => true,
        };
        if needs_rebuild {
            let ctx = scaling::Context::get(
                self.codec_ctx.format(),
                self.codec_ctx.width(),
                self.codec_ctx.height(),
                Pixel::RGB24,
                dst_w,
                dst_h,
                Flags::LANCZOS,
            )
            .context("failed to build scaling context")?;
            self.sws = Some((dst_w, dst_h, SendableSws(ctx)));
        }
        Ok(())
    }

    fn seek_to(&mut self, target_frame: i64) -> Result<()> {
        let ts = self.pts_for_frame(target_frame);
        self.input
            .seek(ts, i64::MIN..ts)
            .context("seek failed")?;
        self.codec_ctx.flush();
        self.last_index = None;
        Ok(())
    }

    /// Decodes packets forward from the current demux position, discarding
    /// any decoded frame whose index is behind the target, until the
    /// target frame's index is reached (or the end of stream).
    fn decode_until(&mut self, target_frame: i64) -> Result<(Video, bool)> {
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.codec_ctx
                .send_packet(&packet)
                .context("failed to send packet to decoder")?;
            while self
                .codec_ctx
                .receive_frame(&mut self.src_frame)
                .is_ok()
            {
                // Free function, not a `&self` method: `self.input` is still
                // mutably borrowed by the enclosing `packets()` iterator, so
                // only disjoint fields (`time_base`, `fps`, `src_frame`) may
                // be touched here.
                let idx = frame_index_of(self.src_frame.pts().unwrap_or(0), self.time_base, self.fps);
                if idx >= target_frame {
                    return Ok((self.src_frame.clone(), self.src_frame.is_key()));
                }
            }
        }
        Err(anyhow!("reached end of stream before frame {target_frame}"))
    }

    fn pts_for_frame(&self, frame_index: i64) -> i64 {
        pts_for_frame(frame_index, self.time_base, self.fps)
    }
}
