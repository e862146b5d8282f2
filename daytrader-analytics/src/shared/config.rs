/// Dashboard configuration
///
/// Every value can be overridden through an environment variable; unset or
/// unparseable variables fall back to the defaults below.
use std::time::Duration;

use super::activity::{DEFAULT_ACTIVITY_WINDOW_SECS, TOP_AGENT_LIMIT};
use super::price_window::DEFAULT_PRICE_WINDOW;

/// Polling and computation settings
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Backend base URL (env: API_BASE)
    pub api_base: String,
    /// Interval between poll ticks (env: POLL_INTERVAL_MS)
    pub poll_interval: Duration,
    /// Per-request timeout (env: REQUEST_TIMEOUT_MS)
    pub request_timeout: Duration,
    /// Most recent posts requested per tick (env: POST_LIMIT)
    pub post_limit: usize,
    /// Most recent trades requested per tick (env: TRADE_LIMIT)
    pub trade_limit: usize,
    /// Rolling price window capacity (env: PRICE_WINDOW)
    pub price_window: usize,
    /// Trailing window for agent activity (env: ACTIVITY_WINDOW_SECS)
    pub activity_window_secs: f64,
    pub display: DisplayLimits,
}

/// How many entries of each list make it into a [`ViewModel`](super::view::ViewModel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLimits {
    pub mentions: usize,
    pub top_agents: usize,
    pub trades: usize,
    pub equity: usize,
    pub research: usize,
    pub commodities: usize,
    /// Crypto rows shown when there are no commodities to match
    pub cryptos_fallback: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            mentions: 8,
            top_agents: TOP_AGENT_LIMIT,
            trades: 14,
            equity: 7,
            research: 8,
            commodities: 6,
            cryptos_fallback: 4,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            poll_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            post_limit: 200,
            trade_limit: 200,
            price_window: DEFAULT_PRICE_WINDOW,
            activity_window_secs: DEFAULT_ACTIVITY_WINDOW_SECS,
            display: DisplayLimits::default(),
        }
    }
}

impl DashboardConfig {
    /// Create a new configuration with custom backend URL
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let millis = |key: &str, default: Duration| {
            parsed(key)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let count = |key: &str, default: usize| {
            parsed(key)
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        Self {
            api_base: parsed("API_BASE").unwrap_or(defaults.api_base),
            poll_interval: millis("POLL_INTERVAL_MS", defaults.poll_interval),
            request_timeout: millis("REQUEST_TIMEOUT_MS", defaults.request_timeout),
            post_limit: count("POST_LIMIT", defaults.post_limit),
            trade_limit: count("TRADE_LIMIT", defaults.trade_limit),
            price_window: count("PRICE_WINDOW", defaults.price_window),
            activity_window_secs: parsed("ACTIVITY_WINDOW_SECS")
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .unwrap_or(defaults.activity_window_secs),
            display: defaults.display,
        }
    }

    /// Set poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set post/trade fetch limits
    pub fn with_fetch_limits(mut self, posts: usize, trades: usize) -> Self {
        self.post_limit = posts;
        self.trade_limit = trades;
        self
    }

    /// Set rolling price window capacity
    pub fn with_price_window(mut self, capacity: usize) -> Self {
        self.price_window = capacity;
        self
    }

    /// Set trailing activity window
    pub fn with_activity_window_secs(mut self, secs: f64) -> Self {
        self.activity_window_secs = secs;
        self
    }

    /// Set display truncation limits
    pub fn with_display_limits(mut self, display: DisplayLimits) -> Self {
        self.display = display;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.post_limit, 200);
        assert_eq!(config.trade_limit, 200);
        assert_eq!(config.price_window, 48);
        assert_eq!(config.activity_window_secs, 300.0);
        assert_eq!(config.display.trades, 14);
    }

    #[test]
    fn test_config_builder() {
        let config = DashboardConfig::new("http://backend:9000")
            .with_poll_interval(Duration::from_millis(500))
            .with_request_timeout(Duration::from_secs(1))
            .with_fetch_limits(50, 25)
            .with_price_window(12)
            .with_activity_window_secs(60.0);

        assert_eq!(config.api_base, "http://backend:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.post_limit, 50);
        assert_eq!(config.trade_limit, 25);
        assert_eq!(config.price_window, 12);
        assert_eq!(config.activity_window_secs, 60.0);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("API_BASE", " http://10.0.0.5:8000 "),
            ("POLL_INTERVAL_MS", "1000"),
            ("POST_LIMIT", "not-a-number"),
            ("PRICE_WINDOW", "0"),
            ("ACTIVITY_WINDOW_SECS", "120"),
        ]);
        let config = DashboardConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base, "http://10.0.0.5:8000");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        // Invalid and zero values fall back to defaults
        assert_eq!(config.post_limit, 200);
        assert_eq!(config.price_window, 48);
        assert_eq!(config.activity_window_secs, 120.0);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
