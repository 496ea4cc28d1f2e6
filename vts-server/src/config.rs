//! Startup configuration, read once from the environment. There is no
//! config file: unlike the teacher's TLC-experiment config, a VTSource
//! daemon has nothing worth persisting between runs.

use std::net::SocketAddr;
use std::time::Duration;

use vts_video::DEFAULT_CACHE_CAPACITY;
use vts_protocol::DEFAULT_PORT;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub cache_capacity: usize,
    pub idle_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            idle_timeout: None,
        }
    }
}

impl Config {
    /// `VTS_LISTEN`, `VTS_CACHE_CAPACITY`, `VTS_IDLE_TIMEOUT_MS`. A present
    /// but unparsable value is a startup error; an absent one falls back to
    /// the default.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Ok(listen) = std::env::var("VTS_LISTEN") {
            config.listen = listen
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid VTS_LISTEN {listen:?}: {e}"))?;
        }

        if let Ok(capacity) = std::env::var("VTS_CACHE_CAPACITY") {
            config.cache_capacity = capacity
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid VTS_CACHE_CAPACITY {capacity:?}: {e}"))?;
        }

        if let Ok(millis) = std::env::var("VTS_IDLE_TIMEOUT_MS") {
            let millis: u64 = millis
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid VTS_IDLE_TIMEOUT_MS {millis:?}: {e}"))?;
            config.idle_timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }
}
