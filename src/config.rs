use clap::Args;
use std::time::Duration;

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the Lume API
    #[arg(long, global = true, env = "LUME_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// User whose profile, jobs and applications are loaded
    #[arg(long, global = true, env = "LUME_USER_ID", default_value = "test123")]
    pub user_id: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "LUME_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
