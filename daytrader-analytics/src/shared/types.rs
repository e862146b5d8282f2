/// Core record types served by the Daytrader Agents backend
///
/// These types match the JSON bodies returned under `/api/*`. Optional fields
/// default to `None` so a partially populated record never fails to decode.
use serde::{Deserialize, Serialize};

/// Identifier of a forum post
pub type PostId = u64;

/// Agent-authored forum post
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub id: PostId,
    /// Unix seconds (fractional)
    pub ts: f64,
    pub agent: String,
    #[serde(default)]
    pub text: String,
    /// Parent post, absent or null for a thread root. May dangle.
    #[serde(default)]
    pub reply_to: Option<PostId>,
}

/// Paper trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TradeSide {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
    #[serde(other)]
    Unknown,
}

impl TradeSide {
    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
            TradeSide::Unknown => "?",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simulated paper trade (display only)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: u64,
    pub ts: f64,
    pub agent: String,
    pub side: TradeSide,
    pub qty: f64,
    pub price: f64,
}

/// Commodity or crypto quote
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketQuote {
    pub id: String,
    pub label: String,
    pub symbol: String,
    pub price: f64,
    /// 24h change in percent
    pub change_pct: f64,
    #[serde(default)]
    pub change_pct_7d: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl MarketQuote {
    pub fn is_up(&self) -> bool {
        self.change_pct >= 0.0
    }
}

/// Research link scraped by the backend (Reddit highlights)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResearchItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub ts: Option<f64>,
}

impl ResearchItem {
    /// Score for display, `n/a` when the backend did not provide one
    pub fn score_label(&self) -> String {
        self.score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    }
}

/// Paper equity row from `/api/pnl` (already sorted by the backend)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentEquity {
    pub agent: String,
    pub equity: f64,
    #[serde(default)]
    pub cash: Option<f64>,
    #[serde(default)]
    pub position: Option<f64>,
}

/// Backend configuration, fetched once at startup
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub agent_count: u32,
    pub tick_seconds: f64,
    pub model_name: String,
    pub using_claude_api: bool,
    pub max_posts_per_tick: Option<u32>,
    pub mode: Option<String>,
}

/// Body of `/api/state`: latest price plus oldest-first posts and trades
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct StatePayload {
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

/// Body of `/api/markets`
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MarketsPayload {
    #[serde(default)]
    pub commodities: Vec<MarketQuote>,
    #[serde(default)]
    pub cryptos: Vec<MarketQuote>,
    #[serde(default)]
    pub updated_ts: f64,
}
