//! Per-agent posting activity over a trailing time window.

use indexmap::IndexMap;
use serde::Serialize;

use super::types::Post;

/// Default trailing window (5 minutes)
pub const DEFAULT_ACTIVITY_WINDOW_SECS: f64 = 300.0;

/// Agents listed in the ranking
pub const TOP_AGENT_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentActivity {
    pub agent: String,
    pub posts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    /// Distinct agents that posted within the window
    pub active_count: usize,
    pub most_active: Option<String>,
    /// Descending by post count, at most [`TOP_AGENT_LIMIT`] by default
    pub top_agents: Vec<AgentActivity>,
}

impl ActivitySummary {
    /// Rank agents by posts with `ts >= now - window_secs`.
    ///
    /// Counts keep the order in which agents are first encountered in `posts`,
    /// which breaks every tie.
    pub fn compute(posts: &[Post], now: f64, window_secs: f64) -> Self {
        Self::compute_with_limit(posts, now, window_secs, TOP_AGENT_LIMIT)
    }

    pub fn compute_with_limit(posts: &[Post], now: f64, window_secs: f64, limit: usize) -> Self {
        let cutoff = now - window_secs;

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for post in posts.iter().filter(|post| post.ts >= cutoff) {
            *counts.entry(post.agent.as_str()).or_insert(0) += 1;
        }

        // Strictly greater keeps the earliest agent on ties
        let most_active = counts
            .iter()
            .fold(None::<(&str, usize)>, |best, (agent, count)| match best {
                Some((_, best_count)) if *count <= best_count => best,
                _ => Some((*agent, *count)),
            })
            .map(|(agent, _)| agent.to_string());

        let mut ranked: Vec<(&str, usize)> = counts.iter().map(|(agent, count)| (*agent, *count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            active_count: counts.len(),
            most_active,
            top_agents: ranked
                .into_iter()
                .take(limit)
                .map(|(agent, posts)| AgentActivity {
                    agent: agent.to_string(),
                    posts,
                })
                .collect(),
        }
    }
}
