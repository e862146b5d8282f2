/// HTTP client for the Daytrader Agents backend
///
/// Implements [`ForumSource`] over the backend's JSON endpoints. Every request
/// carries the configured timeout; non-2xx responses and undecodable bodies
/// surface as typed [`FetchError`]s.
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::config::DashboardConfig;
use super::error::FetchError;
use super::source::ForumSource;
use super::types::{AgentEquity, BackendConfig, MarketsPayload, ResearchItem, StatePayload};

const CONFIG_PATH: &str = "api/config";
const STATE_PATH: &str = "api/state";
const PNL_PATH: &str = "api/pnl";
const RESEARCH_PATH: &str = "api/research";
const MARKETS_PATH: &str = "api/markets";

#[derive(Debug, Clone)]
pub struct HttpForumSource {
    client: Client,
    base: Url,
    post_limit: usize,
    trade_limit: usize,
}

impl HttpForumSource {
    pub fn new(config: &DashboardConfig) -> Result<Self, FetchError> {
        let base = normalize_base(&config.api_base)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| FetchError::Client(error.to_string()))?;

        Ok(Self {
            client,
            base,
            post_limit: config.post_limit,
            trade_limit: config.trade_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `{base}/api/state?limit_posts=N&limit_trades=M`
    pub fn state_url(&self) -> Result<Url, FetchError> {
        let mut url = self.endpoint_url(STATE_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit_posts", &self.post_limit.to_string())
            .append_pair("limit_trades", &self.trade_limit.to_string());
        Ok(url)
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|error| FetchError::InvalidUrl(format!("{}{}: {}", self.base, path, error)))
    }

    async fn get_json<T>(&self, endpoint: &str, url: Url) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        debug!(%url, "requesting {}", endpoint);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::from_reqwest(endpoint, error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::from_reqwest(endpoint, error))?;

        serde_json::from_slice(&body).map_err(|error| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl ForumSource for HttpForumSource {
    async fn fetch_config(&self) -> Result<BackendConfig, FetchError> {
        let url = self.endpoint_url(CONFIG_PATH)?;
        self.get_json("config", url).await
    }

    async fn fetch_state(&self) -> Result<StatePayload, FetchError> {
        let url = self.state_url()?;
        self.get_json("state", url).await
    }

    async fn fetch_pnl(&self) -> Result<Vec<AgentEquity>, FetchError> {
        let url = self.endpoint_url(PNL_PATH)?;
        self.get_json("pnl", url).await
    }

    async fn fetch_research(&self) -> Result<Vec<ResearchItem>, FetchError> {
        let url = self.endpoint_url(RESEARCH_PATH)?;
        self.get_json("research", url).await
    }

    async fn fetch_markets(&self) -> Result<MarketsPayload, FetchError> {
        let url = self.endpoint_url(MARKETS_PATH)?;
        self.get_json("markets", url).await
    }
}

/// Parse the base URL, forcing a trailing slash so endpoint paths join beneath it.
fn normalize_base(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash).map_err(|error| FetchError::InvalidUrl(format!("{}: {}", raw, error)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!("{}: unsupported scheme {}", raw, other))),
    }
}
