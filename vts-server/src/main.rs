use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use vts_server::config::Config;
use vts_server::dispatch::Shared;
use vts_server::session;
use vts_video::VideoSource;

fn main() -> anyhow::Result<()> {
    vts_util::log::init();
    vts_video::init();

    let config = Config::from_env()?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(config))
}

/// Accept loop plus graceful shutdown, per `spec.md` §4.7: stop accepting on
/// `SIGINT`, let in-flight connections finish, then return.
async fn run(config: Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, "vtsourced listening");

    let state: Shared = Arc::new(Mutex::new(VideoSource::new(config.cache_capacity)));
    let idle_timeout = config.idle_timeout;
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let state = state.clone();
                        connections.spawn(async move {
                            if let Err(e) = session::handle_connection(stream, state, idle_timeout).await {
                                warn!(%peer, error = %e, "connection ended with an error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    info!("waiting for in-flight connections to finish");
    while connections.join_next().await.is_some() {}
    info!("shutdown complete");

    Ok(())
}
