use crate::monitor::constants::{DEFAULT_ECHO_PORT, VALID_LOG_LEVELS};
use crate::monitor::logging::is_valid_log_level;
use crate::server::echo::ServerError;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Command line of the echo reflector
#[derive(Parser, Debug, Clone)]
#[command(name = "echo-server")]
#[command(about = "UDP echo reflector for jitterscope probes")]
pub struct ServerConfig {
    /// Local IP address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// UDP port to listen on
    #[arg(long, default_value_t = DEFAULT_ECHO_PORT)]
    pub port: u16,

    /// Suppress the summary printed on shutdown
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl ServerConfig {
    /// Listening socket address; the bind value must be an IP literal.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self.bind.trim_matches(['[', ']']).parse().map_err(|_| {
            ServerError::Config(format!("bind address {:?} is not an IP address", self.bind))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.port == 0 {
            return Err(ServerError::Config(
                "port must be > 0 so monitors know where to send probes".into(),
            ));
        }
        self.socket_addr()?;
        if !is_valid_log_level(&self.log_level) {
            return Err(ServerError::Config(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        debug!(bind = %self.bind, port = self.port, "Reflector configuration accepted");
        Ok(())
    }

    pub fn is_json_format(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        ServerConfig::parse_from(std::iter::once("echo-server").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_listen_on_echo_port() -> Result<(), ServerError> {
        let config = parse(&[]);

        config.validate()?;
        assert_eq!(config.socket_addr()?, "0.0.0.0:7007".parse::<SocketAddr>().unwrap());
        assert!(!config.is_json_format());
        Ok(())
    }

    #[test]
    fn test_ipv6_bind_address() -> Result<(), ServerError> {
        let plain = parse(&["--bind", "::1", "--port", "9000"]);
        let bracketed = parse(&["--bind", "[::1]", "--port", "9000"]);

        assert_eq!(plain.socket_addr()?, "[::1]:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(plain.socket_addr()?, bracketed.socket_addr()?);
        Ok(())
    }

    #[test]
    fn test_rejects_host_names_and_port_zero() {
        let by_name = parse(&["--bind", "localhost"]);
        assert!(matches!(by_name.validate(), Err(ServerError::Config(_))));

        let ephemeral = parse(&["--port", "0"]);
        let err = ephemeral.validate().err().unwrap();
        assert!(err.to_string().contains("port must be > 0"));
    }

    #[test]
    fn test_log_settings() {
        let config = parse(&["--log-level", "DEBUG", "--log-format", "json"]);
        assert!(config.validate().is_ok());
        assert!(config.is_json_format());

        let config = parse(&["--log-level", "chatty"]);
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }
}
