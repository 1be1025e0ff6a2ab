use jobcrawl_core::CrawlError;

/// Where the server listens and what it crawls by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_listing_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5050,
            default_listing_url: None,
        }
    }
}

impl ServerConfig {
    /// Reads `JOBCRAWL_HOST`, `JOBCRAWL_PORT` and `JOBCRAWL_LISTING_URL`.
    pub fn from_env() -> Result<Self, CrawlError> {
        let defaults = Self::default();
        let port = match std::env::var("JOBCRAWL_PORT") {
            Err(_) => defaults.port,
            Ok(raw) => parse_port(&raw)?,
        };
        Ok(Self {
            host: std::env::var("JOBCRAWL_HOST").unwrap_or(defaults.host),
            port,
            default_listing_url: std::env::var("JOBCRAWL_LISTING_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }

    /// `host:port`, resolved by the listener so hostnames work too.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16, CrawlError> {
    raw.trim()
        .parse()
        .map_err(|_| CrawlError::ConfigError(format!("Invalid JOBCRAWL_PORT '{raw}'")))
}
