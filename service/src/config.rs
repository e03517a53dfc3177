use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default Backlog OAuth scope; Backlog only defines `read`.
pub const DEFAULT_BACKLOG_OAUTH_SCOPE: &str = "read";

/// Default URL of the frontend the OAuth callback lands on.
pub const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl fmt::Display for RustEnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of: development, production, staging")
    }
}

impl std::error::Error for RustEnvParseError {}

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_FRONTEND_BASE_URL
    )]
    pub allowed_origins: Vec<String>,

    /// The URL of the Backlog space, e.g. https://acme.backlog.com
    #[arg(long, env)]
    backlog_space_url: Option<String>,

    /// The OAuth client ID registered for this application in Backlog.
    #[arg(long, env)]
    backlog_client_id: Option<String>,

    /// The OAuth client secret registered for this application in Backlog.
    #[arg(long, env, hide_env_values = true)]
    backlog_client_secret: Option<String>,

    /// The redirect URI registered in Backlog; must point at /auth/callback.
    #[arg(long, env)]
    backlog_redirect_uri: Option<String>,

    /// The OAuth scope requested during authorization.
    #[arg(long, env, default_value = DEFAULT_BACKLOG_OAUTH_SCOPE)]
    backlog_oauth_scope: String,

    /// The base URL of the frontend application. Users land here after a
    /// successful OAuth callback.
    #[arg(long, env, default_value = DEFAULT_FRONTEND_BASE_URL)]
    frontend_base_url: String,

    /// Optional timeout in seconds for calls to Backlog. Unset means the
    /// transport default (no timeout).
    #[arg(long, env)]
    upstream_timeout_secs: Option<u64>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3001)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(short, long, env, default_value_t = LevelFilter::Info)]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(short, long, env, default_value_t = RustEnv::Development)]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub backend_session_expiry_seconds: u64,

    /// Name of the session cookie.
    #[arg(long, env, default_value = "backlog_relay.sid")]
    pub session_cookie_name: String,

    /// Enable per-client rate limiting on the auth and API routes.
    #[arg(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    pub rate_limit_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn backlog_space_url(&self) -> Option<String> {
        self.backlog_space_url.clone()
    }

    pub fn backlog_client_id(&self) -> Option<String> {
        self.backlog_client_id.clone()
    }

    pub fn backlog_client_secret(&self) -> Option<String> {
        self.backlog_client_secret.clone()
    }

    pub fn backlog_redirect_uri(&self) -> Option<String> {
        self.backlog_redirect_uri.clone()
    }

    pub fn backlog_oauth_scope(&self) -> &str {
        &self.backlog_oauth_scope
    }

    /// Returns the frontend application base URL the OAuth callback redirects to.
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub fn upstream_timeout_secs(&self) -> Option<u64> {
        self.upstream_timeout_secs
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_env_parses_case_insensitively() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }

    #[test]
    fn test_config_from_flags() {
        let config = Config::parse_from([
            "backlog_relay",
            "--backlog-space-url",
            "https://acme.backlog.com",
            "--backlog-client-id",
            "client",
            "--backlog-client-secret",
            "secret",
            "--backlog-redirect-uri",
            "http://localhost:3001/auth/callback",
            "--runtime-env",
            "production",
            "--rate-limit-enabled",
            "false",
        ]);

        assert_eq!(
            config.backlog_space_url().as_deref(),
            Some("https://acme.backlog.com")
        );
        assert_eq!(config.backlog_client_id().as_deref(), Some("client"));
        assert_eq!(config.backlog_client_secret().as_deref(), Some("secret"));
        assert!(config.is_production());
        assert!(!config.rate_limit_enabled);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::parse_from(["backlog_relay"]);

        assert_eq!(config.backlog_oauth_scope(), DEFAULT_BACKLOG_OAUTH_SCOPE);
        assert!(config.upstream_timeout_secs().is_none());
        assert!(config.rate_limit_enabled);
    }
}
