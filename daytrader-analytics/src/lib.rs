/// Daytrader Agents Analytics - Shared Library
///
/// Polls the Daytrader Agents backend and turns each tick into one immutable,
/// display-ready [`ViewModel`]. Used by the `daytrader-dashboard` binary.
///
/// The library includes:
/// - Core record types served by the backend
/// - HTTP source with typed fetch errors
/// - Thread builder, sentiment, mention tally and activity ranking
/// - Rolling price window with trend and sparkline
/// - Orchestrator publishing views on a `watch` channel
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{
    AgentEquity, BackendConfig, MarketQuote, MarketsPayload, Post, PostId, ResearchItem,
    StatePayload, Trade, TradeSide,
};

pub use shared::config::{DashboardConfig, DisplayLimits};
pub use shared::error::FetchError;

pub use shared::client::HttpForumSource;
pub use shared::source::{ForumSource, TickInputs};

// Analytics
pub use shared::activity::{ActivitySummary, AgentActivity};
pub use shared::keywords::{KeywordTopic, DEFAULT_KEYWORDS};
pub use shared::mentions::{tally_mentions, MentionTally};
pub use shared::price_window::{build_sparkline, PriceStats, PriceWindow, SparkPoint, Trend};
pub use shared::sentiment::{extract_bias, Bias, Mood, SentimentCounts};
pub use shared::threads::{build_threads, extract_headline, ThreadNode};

// Pipeline
pub use shared::orchestrator::{Clock, Orchestrator, TickOutcome};
pub use shared::view::ViewModel;
