use std::net::SocketAddr;
use std::path::PathBuf;

use bulwark_config::Config;
use clap::Parser;

/// Bulwark HTTP shell
#[derive(Debug, Parser)]
#[command(name = "bulwark", about = "HTTP middleware shell with a centralized error pipeline")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bulwark.toml", env = "BULWARK_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "BULWARK_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Override only the listen port; ignored when `--listen` is given
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log filter directives (e.g. "info" or "bulwark_server=debug")
    #[arg(long, default_value = "info", env = "BULWARK_LOG")]
    pub log: String,
}

impl Args {
    /// Load the configuration file and apply the listen overrides
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config)?;
        config.server.listen_address = self.listen_address(config.server.listen_address);
        Ok(config)
    }

    /// Listen address after applying command-line overrides
    pub fn listen_address(&self, configured: Option<SocketAddr>) -> Option<SocketAddr> {
        if let Some(listen) = self.listen {
            return Some(listen);
        }

        let port = self.port?;
        let mut address = configured.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        address.set_port(port);
        Some(address)
    }
}
