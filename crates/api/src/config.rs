/// HTTP server configuration loaded from environment variables.
///
/// Every field falls back to a local-development default, so a bare
/// `cargo run` works without any environment set up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: `0.0.0.0`).
    pub host: String,
    /// Port to bind (default: `3000`).
    pub port: u16,
    /// Origins allowed by CORS, from the comma-separated `API_CORS_ORIGINS`
    /// variable.
    pub cors_origins: Vec<String>,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `API_HOST`                 | `0.0.0.0`               |
    /// | `API_PORT`                 | `3000`                  |
    /// | `API_CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `API_REQUEST_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("API_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("API_PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("API_CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("API_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("API_REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }

    /// The `host:port` pair to hand to the TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
        }
    }
}
