/// Display-ready snapshot derived from one poll tick
///
/// [`ViewModel::build`] is pure: identical inputs, window and `now` always
/// produce an identical view. It never mutates the price window.
use serde::Serialize;

use super::activity::ActivitySummary;
use super::config::DashboardConfig;
use super::keywords::DEFAULT_KEYWORDS;
use super::mentions::{tally_mentions, MentionTally};
use super::price_window::{PriceStats, PriceWindow, SparkPoint};
use super::sentiment::{Mood, SentimentCounts};
use super::source::TickInputs;
use super::threads::{build_threads, ThreadNode};
use super::types::{AgentEquity, BackendConfig, MarketQuote, Post, ResearchItem, Trade};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewModel {
    /// Tick generation that produced this view, 0 before the first tick
    pub generation: u64,
    pub config: Option<BackendConfig>,
    pub price: f64,
    pub price_stats: PriceStats,
    pub sparkline: Vec<SparkPoint>,
    pub sentiment: SentimentCounts,
    pub mood: Mood,
    pub mentions: Vec<MentionTally>,
    pub activity: ActivitySummary,
    pub threads: Vec<ThreadNode>,
    /// Most recent first
    pub posts: Vec<Post>,
    /// Most recent first
    pub trades: Vec<Trade>,
    pub top_equity: Vec<AgentEquity>,
    pub research: Vec<ResearchItem>,
    pub commodities: Vec<MarketQuote>,
    pub cryptos: Vec<MarketQuote>,
    pub markets_updated_ts: f64,
}

impl ViewModel {
    /// Project raw tick inputs into a view.
    ///
    /// `window` must already contain this tick's price sample.
    pub fn build(
        generation: u64,
        config: Option<BackendConfig>,
        inputs: TickInputs,
        window: &PriceWindow,
        now: f64,
        settings: &DashboardConfig,
    ) -> Self {
        let TickInputs {
            state,
            pnl,
            research,
            markets,
        } = inputs;
        let limits = &settings.display;

        let sentiment = SentimentCounts::from_posts(&state.posts);

        let mut mentions = tally_mentions(DEFAULT_KEYWORDS, &state.posts, &research);
        mentions.truncate(limits.mentions);

        let threads = build_threads(&state.posts);

        // Backend sends oldest first
        let posts: Vec<Post> = state.posts.into_iter().rev().collect();
        let activity = ActivitySummary::compute_with_limit(
            &posts,
            now,
            settings.activity_window_secs,
            limits.top_agents,
        );

        let trades: Vec<Trade> = state.trades.into_iter().rev().take(limits.trades).collect();

        let commodities: Vec<MarketQuote> =
            markets.commodities.into_iter().take(limits.commodities).collect();
        let crypto_limit = match commodities.len() {
            0 => limits.cryptos_fallback,
            len => len,
        };
        let cryptos: Vec<MarketQuote> = markets.cryptos.into_iter().take(crypto_limit).collect();

        Self {
            generation,
            config,
            price: state.price,
            price_stats: window.stats(state.price),
            sparkline: window.sparkline(),
            mood: Mood::from_counts(&sentiment),
            sentiment,
            mentions,
            activity,
            threads,
            posts,
            trades,
            top_equity: pnl.into_iter().take(limits.equity).collect(),
            research: research.into_iter().take(limits.research).collect(),
            commodities,
            cryptos,
            markets_updated_ts: markets.updated_ts,
        }
    }

    /// True until the first successful tick has been applied
    pub fn is_empty(&self) -> bool {
        self.generation == 0
    }
}
