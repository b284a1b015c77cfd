use std::time::Duration;

use jobfeed_core::error::AppError;
use jobfeed_core::traits::Fetcher;
use reqwest::Client;

/// Browser-like User-Agent; several job boards reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// How requests reach the source sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    #[default]
    Direct,
    /// Pass-through proxy addressed by URL prefix, e.g. `https://proxy.example/`
    /// or `https://proxy.example/fetch?url=`. A prefix ending in `=` gets the
    /// target URL percent-encoded.
    Prefix(String),
    /// Regular HTTP(S)/SOCKS proxy for all requests.
    Http(String),
}

impl ProxyConfig {
    /// The URL actually requested for `url`.
    pub fn route(&self, url: &str) -> String {
        match self {
            ProxyConfig::Prefix(prefix) if prefix.ends_with('=') => {
                let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
                format!("{prefix}{encoded}")
            }
            ProxyConfig::Prefix(prefix) => format!("{prefix}{url}"),
            ProxyConfig::Direct | ProxyConfig::Http(_) => url.to_string(),
        }
    }
}

/// HTTP fetcher using reqwest.
///
/// Downloads raw HTML with a fixed User-Agent and timeout. Any non-2xx
/// status is an error. Requests are never retried here.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    proxy: ProxyConfig,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(DEFAULT_TIMEOUT, ProxyConfig::Direct)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Self::with_config(timeout, ProxyConfig::Direct)
    }

    pub fn with_config(timeout: Duration, proxy: ProxyConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout);
        if let ProxyConfig::Http(proxy_url) = &proxy {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .map_err(|e| AppError::HttpError(format!("Invalid proxy '{proxy_url}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            proxy,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let target = self.proxy.route(url);
        tracing::debug!(%url, via = %target, "Fetching page");

        let response = self.client.get(&target).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })
    }
}
