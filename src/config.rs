use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

const DEFAULT_PORT: u16 = 5000;

/// Process-level settings read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: parse_env("HOST").unwrap_or_else(|| IpAddr::from([0, 0, 0, 0])),
            port: parse_env("PORT").unwrap_or(DEFAULT_PORT),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}
