//! Protocol Handler: the per-connection state machine, per `spec.md` §4.6.
//! One task per connection; all mutable state lives in the shared
//! `VideoSource`, not here.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use vts_protocol::{error_line, hello_line, parse_line, ParseError};

use crate::dispatch::{dispatch, Reply, Shared};

const SERVER_NAME: &str = "vtsourced";

/// Runs the protocol loop for one accepted connection until the client
/// sends `BYE`, disconnects, or the idle timeout (if any) elapses.
#[instrument(skip(stream, state))]
pub async fn handle_connection(
    stream: TcpStream,
    state: Shared,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(hello_line(SERVER_NAME, env!("CARGO_PKG_VERSION")).as_bytes())
        .await?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = match idle_timeout {
            None => reader.read_line(&mut line).await?,
            Some(timeout) => match tokio::time::timeout(timeout, reader.read_line(&mut line)).await {
                Ok(result) => result?,
                Err(_elapsed) => {
                    debug!("idle timeout elapsed, closing connection");
                    break;
                }
            },
        };
        if read == 0 {
            debug!("client disconnected");
            break;
        }

        let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
        let parsed = match parse_line(trimmed) {
            Ok(cmd) => cmd,
            Err(ParseError::UnterminatedQuote) => {
                let err = vts_video::VtsError::InvalidArgument("unterminated quote".to_owned());
                write_half.write_all(error_line(&err).as_bytes()).await?;
                continue;
            }
        };

        match dispatch(&state, parsed).await {
            Ok(Reply::Bye) => {
                write_half.write_all(b"OK BYE\n").await?;
                break;
            }
            Ok(Reply::Text(text)) => {
                write_half.write_all(text.as_bytes()).await?;
            }
            Ok(Reply::Frame { line: resp_line, header, frame }) => {
                write_half.write_all(resp_line.as_bytes()).await?;
                // Header and payload travel as a single write so a client
                // never observes a framed response cut in half.
                let mut framed = Vec::with_capacity(header.len() + frame.payload.len());
                framed.extend_from_slice(&header);
                framed.extend_from_slice(&frame.payload);
                write_half.write_all(&framed).await?;
            }
            Err(e) => {
                debug!(error = %e, "command failed");
                write_half.write_all(error_line(&e).as_bytes()).await?;
            }
        }
    }

    Ok(())
}
