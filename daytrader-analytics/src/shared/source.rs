use async_trait::async_trait;

use super::error::FetchError;
use super::types::{AgentEquity, BackendConfig, MarketsPayload, ResearchItem, StatePayload};

/// Source of raw backend records consumed on every poll tick.
///
/// The HTTP implementation is [`HttpForumSource`](super::client::HttpForumSource);
/// tests drive the orchestrator with in-memory fakes.
#[async_trait]
pub trait ForumSource: Send + Sync {
    async fn fetch_config(&self) -> Result<BackendConfig, FetchError>;

    /// Latest price plus oldest-first posts and trades
    async fn fetch_state(&self) -> Result<StatePayload, FetchError>;

    /// Agent equity rows, already sorted by the backend
    async fn fetch_pnl(&self) -> Result<Vec<AgentEquity>, FetchError>;

    async fn fetch_research(&self) -> Result<Vec<ResearchItem>, FetchError>;

    async fn fetch_markets(&self) -> Result<MarketsPayload, FetchError>;
}

/// Raw inputs of one tick, fetched together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInputs {
    pub state: StatePayload,
    pub pnl: Vec<AgentEquity>,
    pub research: Vec<ResearchItem>,
    pub markets: MarketsPayload,
}

impl TickInputs {
    /// Fetch every per-tick endpoint concurrently; the first failure abandons the tick.
    pub async fn fetch<S>(source: &S) -> Result<Self, FetchError>
    where
        S: ForumSource + ?Sized,
    {
        let (state, pnl, research, markets) = tokio::try_join!(
            source.fetch_state(),
            source.fetch_pnl(),
            source.fetch_research(),
            source.fetch_markets(),
        )?;

        Ok(Self {
            state,
            pnl,
            research,
            markets,
        })
    }
}
