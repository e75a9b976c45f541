use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::error;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::Args;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com/search/repositories";
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// GitHub never serves more than 100 results per search page.
pub const MAX_PER_PAGE: u32 = 100;

/// Everything the client and cloner need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub base_url: String,
    pub user_agent: String,
    pub per_page: u32,
    pub max_results: usize,
    /// Pause between successive page requests.
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub clone_dir: PathBuf,
    pub clone_timeout: Duration,
}

impl Config {
    /// Defaults for everything except the token.
    pub fn new(token: impl Into<String>) -> Self {
        Config {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            per_page: MAX_PER_PAGE,
            max_results: 1000,
            request_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            clone_dir: PathBuf::from("."),
            clone_timeout: Duration::from_secs(300),
        }
    }

    /// Builds the configuration from command line arguments, reading the
    /// token from the environment when it was not passed explicitly.
    pub fn from_args(args: &Args) -> Result<Self> {
        let token = resolve_token(args.token.as_deref(), env::var(TOKEN_ENV_VAR).ok())?;

        if args.per_page == 0 || args.per_page > MAX_PER_PAGE {
            return Err(Error::Config(format!(
                "per-page must be between 1 and {}, got {}",
                MAX_PER_PAGE, args.per_page
            )));
        }
        if args.max_attempts == 0 {
            return Err(Error::Config("max-attempts must be at least 1".into()));
        }

        let mut config = Config::new(token);
        config.per_page = args.per_page;
        config.max_results = args.max_results;
        config.retry.max_attempts = args.max_attempts;
        config.clone_dir = args.dir.clone();
        Ok(config)
    }
}

/// Picks the command line token if non-blank, else the environment's.
pub fn resolve_token(cli: Option<&str>, env_value: Option<String>) -> Result<String> {
    match cli {
        Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
        _ => match env_value {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => {
                error!("GitHub token not provided or found in environment");
                Err(Error::Authentication(format!(
                    "no token given; pass --token or set {}",
                    TOKEN_ENV_VAR
                )))
            }
        },
    }
}
