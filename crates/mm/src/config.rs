use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

/// Extra time allowed on top of the long-poll timeout before the HTTP client
/// gives up on a sync request.
const REQUEST_MARGIN: Duration = Duration::from_secs(15);

/// Matrix client that mirrors joined rooms into a directory tree.
///
/// Every message lands in `<dir>/<server>/<user>/<room>/<sender>/<event>`
/// and its path is printed on stdout. Writing to `<room>/in` sends a
/// message to that room.
#[derive(Parser, Debug)]
#[command(name = "mm", version, about)]
pub struct Config {
    /// Homeserver URL (https:// is assumed when no scheme is given)
    #[arg(short = 's', long, env = "MM_SERVER")]
    pub server: String,

    /// Account name to log in with
    #[arg(short = 'u', long, env = "MM_USERNAME")]
    pub username: String,

    #[arg(short = 'p', long, env = "MM_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Storage root [default: $HOME/mm]
    #[arg(short = 'd', long, env = "MM_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Extra PEM root certificate to trust
    #[arg(short = 'c', long, env = "MM_CERTIFICATE")]
    pub certificate: Option<PathBuf>,

    /// Long-poll timeout for sync requests, in milliseconds
    #[arg(long, env = "MM_SYNC_TIMEOUT_MS", default_value_t = 30_000)]
    pub sync_timeout_ms: u64,

    /// Pause after a failed sync, in seconds
    #[arg(long, env = "MM_RETRY_SECS", default_value_t = 10)]
    pub retry_secs: u64,
}

impl Config {
    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.directory {
            return Ok(dir.clone());
        }
        let home = std::env::var_os("HOME").context("HOME is not set; pass --directory")?;
        Ok(PathBuf::from(home).join("mm"))
    }

    pub fn long_poll(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        self.long_poll() + REQUEST_MARGIN
    }
}
