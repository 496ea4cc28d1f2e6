//! Maps a parsed command to a `VideoSource` operation and formats the
//! textual/binary reply, per `spec.md` §6.1. `main.rs` builds a
//! `current_thread` tokio runtime (one reactor thread total), so *every*
//! lock acquisition — not just the decode-heavy verbs — runs inside
//! `tokio::task::spawn_blocking`, the way
//! `examples/starpact-tlc/tlc-server/src/handler.rs` offloads
//! `get_video_nframes`/`decode_frame_base64`: a synchronous
//! `std::sync::Mutex::lock()` call made directly on the reactor thread
//! would stall every other connection for as long as any one client's
//! command (e.g. a decode) held the lock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::task::spawn_blocking;

use vts_format::{Colorspace, VideoStandard};
use vts_protocol::{FrameHeader, ParsedCommand, FRAME_HEADER_LEN};
use vts_video::{FrameBuffer, PlaybackState, SourceInfo, StepOutcome, VideoSource, VtsError};

pub type Shared = Arc<Mutex<VideoSource>>;

/// A formatted reply, ready for `session.rs` to write to the socket.
pub enum Reply {
    /// A single `\n`-terminated text line (or block of lines).
    Text(String),
    /// The `OK FRAMEDATA <size>\n` line plus the 16-byte header and
    /// payload that must reach the client as one contiguous write.
    Frame {
        line: String,
        header: [u8; FRAME_HEADER_LEN],
        frame: Arc<FrameBuffer>,
    },
    /// `OK BYE\n`; the session loop closes the connection after sending it.
    Bye,
}

/// Runs `f` against the shared `VideoSource` on the blocking thread pool,
/// so locking and any decode work it triggers never occupies the
/// single-threaded reactor.
async fn blocking<F, T>(state: Shared, f: F) -> Result<T, VtsError>
where
    F: FnOnce(&mut VideoSource) -> Result<T, VtsError> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(move || {
        let mut source = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut source)
    })
    .await
    .map_err(|e| VtsError::InternalError(format!("task panicked: {e}")))?
}

fn frame_reply(verb: &str, frame: Arc<FrameBuffer>) -> Reply {
    match verb {
        "GETFRAME" => {
            let header = FrameHeader::from(frame.as_ref()).encode();
            let line = format!("OK FRAMEDATA {}\n", frame.payload.len());
            Reply::Frame { line, header, frame }
        }
        _ => Reply::Text(format!(
            "OK FRAMEINFO {} {} {} {} {} {}\n",
            frame.sequence,
            frame.timestamp_ms,
            frame.width,
            frame.height,
            frame.colorspace.code(),
            frame.flags,
        )),
    }
}

fn source_line(info: Option<SourceInfo>) -> String {
    match info {
        None => "OK SOURCE NONE\n".to_owned(),
        Some(info) => format!(
            "OK SOURCE \"{}\" {} {}x{} {} {}\n",
            info.path.display(),
            info.frame_count,
            info.width,
            info.height,
            info.frame_rate,
            info.codec,
        ),
    }
}

fn parse_frame_arg(args: &[String]) -> Result<Option<usize>, VtsError> {
    match args.first() {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| VtsError::InvalidArgument(format!("not a frame index: {s}"))),
    }
}

fn play_state_reply(state: PlaybackState) -> String {
    format!("OK {}\n", state.name())
}

pub async fn dispatch(state: &Shared, cmd: ParsedCommand) -> Result<Reply, VtsError> {
    match cmd.verb.as_str() {
        "BYE" => Ok(Reply::Bye),

        "LIST" => {
            let dir = cmd.args.first().map(PathBuf::from);
            let names = blocking(state.clone(), move |source| source.list(dir.as_deref())).await?;
            let mut out = format!("OK LIST {}\n", names.len());
            for name in &names {
                out.push_str(name);
                out.push('\n');
            }
            Ok(Reply::Text(out))
        }

        "LOAD" => {
            let path = cmd
                .args
                .first()
                .ok_or_else(|| VtsError::InvalidArgument("LOAD requires a path".to_owned()))?;
            let path = PathBuf::from(path);
            let result = blocking(state.clone(), move |source| source.load(&path)).await?;
            Ok(Reply::Text(format!(
                "OK LOADED {} frames\n",
                result.frame_count
            )))
        }

        "SOURCE" => {
            let info = blocking(state.clone(), |source| Ok(source.source_info().cloned())).await?;
            Ok(Reply::Text(source_line(info)))
        }

        "PLAY" => {
            let state_now = blocking(state.clone(), |source| source.play()).await?;
            Ok(Reply::Text(play_state_reply(state_now)))
        }
        "PAUSE" => {
            let state_now = blocking(state.clone(), |source| source.pause()).await?;
            Ok(Reply::Text(play_state_reply(state_now)))
        }
        "STOP" => {
            let state_now = blocking(state.clone(), |source| source.stop()).await?;
            Ok(Reply::Text(play_state_reply(state_now)))
        }

        "SEEK" => {
            let arg = cmd
                .args
                .first()
                .ok_or_else(|| VtsError::InvalidArgument("SEEK requires a frame index".to_owned()))?;
            let frame: usize = arg
                .parse()
                .map_err(|_| VtsError::InvalidArgument(format!("not a frame index: {arg}")))?;
            let seeked = blocking(state.clone(), move |source| source.seek(frame)).await?;
            Ok(Reply::Text(format!("OK SEEKED {seeked}\n")))
        }

        "NEXT" => {
            let outcome = blocking(state.clone(), |source| source.next()).await?;
            Ok(Reply::Text(step_reply(outcome)))
        }
        "PREV" => {
            let outcome = blocking(state.clone(), |source| source.prev()).await?;
            Ok(Reply::Text(step_reply(outcome)))
        }

        "GETFRAME" | "FRAMEINFO" => {
            let key = parse_frame_arg(&cmd.args)?;
            let verb = cmd.verb.clone();
            let frame = blocking(state.clone(), move |source| {
                if verb == "GETFRAME" {
                    source.get_frame(key)
                } else {
                    source.frame_info(key)
                }
            })
            .await?;
            Ok(frame_reply(&cmd.verb, frame))
        }

        "FORMAT" => {
            let args = cmd.args.clone();
            let format = blocking(state.clone(), move |source| {
                if let Some(std_arg) = args.first() {
                    let standard: VideoStandard = std_arg
                        .parse()
                        .map_err(|e: vts_format::ParseEnumError| VtsError::InvalidArgument(e.to_string()))?;
                    let colorspace = match args.get(1) {
                        Some(cs_arg) => cs_arg
                            .parse::<Colorspace>()
                            .map_err(|e| VtsError::InvalidArgument(e.to_string()))?,
                        None => source.format().colorspace,
                    };
                    source.set_format(standard, colorspace);
                }
                Ok(source.format())
            })
            .await?;
            Ok(Reply::Text(format!(
                "OK FORMAT {} {}\n",
                format.standard, format.colorspace
            )))
        }

        "LOOP" => {
            let arg = cmd.args.first().cloned();
            let loop_mode = blocking(state.clone(), move |source| {
                match arg.as_deref() {
                    Some("on") | Some("ON") => source.set_loop(true),
                    Some("off") | Some("OFF") => source.set_loop(false),
                    Some(other) => {
                        return Err(VtsError::InvalidArgument(format!(
                            "expected on|off, got {other}"
                        )))
                    }
                    None => {}
                }
                Ok(source.loop_mode())
            })
            .await?;
            Ok(Reply::Text(format!(
                "OK LOOP {}\n",
                if loop_mode { "ON" } else { "OFF" }
            )))
        }

        "STATUS" => {
            let (state_now, cur, total) = blocking(state.clone(), |source| Ok(source.status())).await?;
            Ok(Reply::Text(format!(
                "OK STATUS {} {} {}\n",
                state_now.name(),
                cur,
                total
            )))
        }

        "INFO" => {
            let info = blocking(state.clone(), |source| {
                source.source_info().cloned().ok_or(VtsError::NotLoaded)
            })
            .await?;
            Ok(Reply::Text(format!(
                "OK INFO {}x{} {}fps {} {} frames {}s\n",
                info.width,
                info.height,
                info.frame_rate,
                info.codec,
                info.frame_count,
                info.duration_secs(),
            )))
        }

        "" => Err(VtsError::UnknownCommand("(empty command)".to_owned())),
        other => Err(VtsError::UnknownCommand(other.to_owned())),
    }
}

fn step_reply(outcome: StepOutcome) -> String {
    match outcome {
        StepOutcome::Frame(n) => format!("OK FRAME {n}\n"),
        StepOutcome::End => "OK END\n".to_owned(),
        StepOutcome::Start => "OK START\n".to_owned(),
    }
}
