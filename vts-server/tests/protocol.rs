//! Protocol-level integration tests: real sockets, driving `vts-server`'s
//! session loop exactly as a client would, per `spec.md` §8.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use vts_server::dispatch::Shared;
use vts_server::session::handle_connection;
use vts_video::VideoSource;

/// Starts a one-shot server on an ephemeral port and returns its address.
/// The accept task is detached; each test opens exactly one connection.
async fn spawn_server(cache_capacity: usize) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state: Shared = Arc::new(Mutex::new(VideoSource::new(cache_capacity)));

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let _ = handle_connection(stream, state, None).await;
        }
    });

    addr
}

async fn read_line(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    line
}

#[tokio::test]
async fn hello_is_sent_on_connect() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, _write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let hello = read_line(&mut reader).await;
    assert!(hello.starts_with("OK HELLO "));
    assert!(hello.contains("VTSource"));
}

#[tokio::test]
async fn getframe_without_source_is_error_501() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"GETFRAME 0\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert!(reply.starts_with("ERROR 501"));
}

#[tokio::test]
async fn load_missing_file_is_error_404_and_connection_stays_usable() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"LOAD /nope.mp4\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert!(reply.starts_with("ERROR 404"));

    // per invariant 10: the connection still answers the next command.
    write_half.write_all(b"STATUS\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert_eq!(reply, "OK STATUS STOPPED 0 0\n");
}

#[tokio::test]
async fn unknown_command_is_error_400_and_does_not_close_connection() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"FROBNICATE\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert!(reply.starts_with("ERROR 400"));

    write_half.write_all(b"SOURCE\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert_eq!(reply, "OK SOURCE NONE\n");
}

#[tokio::test]
async fn unterminated_quote_is_error_401_and_connection_recovers() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"LOAD \"a b/c.mp4\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert!(reply.starts_with("ERROR 401"));

    write_half.write_all(b"STATUS\n").await.unwrap();
    let reply = read_line(&mut reader).await;
    assert_eq!(reply, "OK STATUS STOPPED 0 0\n");
}

#[tokio::test]
async fn commands_are_answered_in_the_order_sent() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half
        .write_all(b"FORMAT PAL YUV420P\nLOOP on\nSTATUS\n")
        .await
        .unwrap();

    assert_eq!(read_line(&mut reader).await, "OK FORMAT PAL YUV420P\n");
    assert_eq!(read_line(&mut reader).await, "OK LOOP ON\n");
    assert_eq!(read_line(&mut reader).await, "OK STATUS STOPPED 0 0\n");
}

#[tokio::test]
async fn bye_closes_the_connection() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"BYE\n").await.unwrap();
    assert_eq!(read_line(&mut reader).await, "OK BYE\n");

    // the server closed its half; further reads hit EOF (0 bytes).
    let mut buf = [0u8; 8];
    let n = reader.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn format_query_without_args_reports_current_format() {
    let addr = spawn_server(4).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let _hello = read_line(&mut reader).await;

    write_half.write_all(b"FORMAT\n").await.unwrap();
    assert_eq!(read_line(&mut reader).await, "OK FORMAT NTSC RGB24\n");
}
