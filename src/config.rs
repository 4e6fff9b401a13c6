use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::origin::AllowedOrigins;
use crate::session::{Correlation, ResponderPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Http,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub allowed_origins: AllowedOrigins,
    pub transport: TransportMode,
    pub responder_policy: ResponderPolicy,
    pub response_timeout: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("MCP_TRANSPORT must be `http` or `stdio`")]
    InvalidTransport,
    #[error("MCP_CORRELATION must be `request-id` or `first-outbound`")]
    InvalidCorrelation,
    #[error("MCP_MAX_IN_FLIGHT must be a positive integer")]
    InvalidMaxInFlight,
    #[error("MCP_RESPONSE_TIMEOUT_SECS must be a positive integer")]
    InvalidResponseTimeout,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = value("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = value("BIND_PORT")
            .map(|port| port.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let allowed_origins = value("MCP_ALLOWED_ORIGINS")
            .map(|list| AllowedOrigins::parse(&list))
            .unwrap_or_default();

        let transport = match value("MCP_TRANSPORT").as_deref() {
            None | Some("http") => TransportMode::Http,
            Some("stdio") => TransportMode::Stdio,
            Some(_) => return Err(ConfigError::InvalidTransport),
        };

        let correlation = value("MCP_CORRELATION")
            .map(|text| {
                text.parse::<Correlation>()
                    .map_err(|_| ConfigError::InvalidCorrelation)
            })
            .transpose()?
            .unwrap_or(Correlation::RequestId);
        let max_in_flight = value("MCP_MAX_IN_FLIGHT")
            .map(|text| {
                text.parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or(ConfigError::InvalidMaxInFlight)
            })
            .transpose()?
            .unwrap_or(1);

        let response_timeout = value("MCP_RESPONSE_TIMEOUT_SECS")
            .map(|text| {
                text.parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or(ConfigError::InvalidResponseTimeout)
            })
            .transpose()?;

        let config = Self {
            bind_addr,
            bind_port,
            allowed_origins,
            transport,
            responder_policy: ResponderPolicy {
                correlation,
                max_in_flight,
            },
            response_timeout,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
