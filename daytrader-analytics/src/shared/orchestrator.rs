/// Poll loop driving the analytics pipeline
///
/// Each tick fetches every endpoint concurrently, appends the new price to the
/// rolling window and publishes a fresh [`ViewModel`] on a `watch` channel.
/// A failed tick publishes nothing and the previous view stays current.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::DashboardConfig;
use super::error::FetchError;
use super::price_window::PriceWindow;
use super::source::{ForumSource, TickInputs};
use super::types::BackendConfig;
use super::view::ViewModel;

/// Wall-clock source in Unix seconds
pub type Clock = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// View for this generation was published
    Applied(u64),
    /// Fetch failed, previous view retained
    Failed(FetchError),
    /// A newer generation was already published, result discarded
    Stale(u64),
    /// Token fired before the result could be applied
    Cancelled,
}

pub struct Orchestrator<S> {
    source: S,
    settings: DashboardConfig,
    window: Mutex<PriceWindow>,
    generation: AtomicU64,
    backend_config: RwLock<Option<BackendConfig>>,
    view_tx: watch::Sender<Arc<ViewModel>>,
    clock: Clock,
}

impl<S> Orchestrator<S>
where
    S: ForumSource,
{
    pub fn new(source: S, settings: DashboardConfig) -> Self {
        let (view_tx, _) = watch::channel(Arc::new(ViewModel::default()));
        Self {
            source,
            window: Mutex::new(PriceWindow::new(settings.price_window)),
            settings,
            generation: AtomicU64::new(0),
            backend_config: RwLock::new(None),
            view_tx,
            clock: Arc::new(unix_now),
        }
    }

    /// Replace the wall clock used for the activity window
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &DashboardConfig {
        &self.settings
    }

    /// Receiver notified whenever a new view is published
    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewModel>> {
        self.view_tx.subscribe()
    }

    /// Most recently published view
    pub fn latest(&self) -> Arc<ViewModel> {
        self.view_tx.borrow().clone()
    }

    pub fn backend_config(&self) -> Option<BackendConfig> {
        self.backend_config.read().clone()
    }

    /// Allocate the next tick generation, starting at 1
    pub fn issue_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Poll until `cancel` fires. The first tick runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_ms = self.settings.poll_interval.as_millis() as u64,
            window = self.settings.price_window,
            "analytics orchestrator started"
        );

        // interval() panics on a zero period
        let period = self.settings.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("analytics orchestrator stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_tick(&cancel).await {
                        TickOutcome::Applied(generation) => debug!(generation, "tick applied"),
                        TickOutcome::Failed(error) => warn!(
                            %error,
                            transient = error.is_transient(),
                            "tick failed, keeping previous view"
                        ),
                        TickOutcome::Stale(generation) => debug!(generation, "stale tick discarded"),
                        TickOutcome::Cancelled => debug!("tick cancelled"),
                    }
                }
            }
        }
    }

    /// Fetch, compute and publish one tick.
    pub async fn run_tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let generation = self.issue_generation();

        let fetched = tokio::select! {
            _ = cancel.cancelled() => return TickOutcome::Cancelled,
            fetched = self.fetch(generation) => fetched,
        };

        match fetched {
            Ok(inputs) => self.complete_tick(generation, inputs, cancel).await,
            Err(error) => TickOutcome::Failed(error),
        }
    }

    async fn fetch(&self, generation: u64) -> Result<TickInputs, FetchError> {
        self.ensure_backend_config().await;
        debug!(generation, "fetching tick inputs");
        TickInputs::fetch(&self.source).await
    }

    /// Fetch the backend config if it has not been fetched successfully yet
    async fn ensure_backend_config(&self) {
        let known = self.backend_config.read().is_some();
        if known {
            return;
        }

        match self.source.fetch_config().await {
            Ok(config) => {
                info!(
                    agents = config.agent_count,
                    model = %config.model_name,
                    "fetched backend config"
                );
                *self.backend_config.write() = Some(config);
            }
            Err(error) => warn!(%error, "failed to fetch backend config, retrying next tick"),
        }
    }

    /// Apply fetched inputs for `generation`, unless cancelled or superseded.
    ///
    /// Holding the window lock serialises apply cycles, so the window sees at
    /// most one append per published generation.
    pub async fn complete_tick(
        &self,
        generation: u64,
        inputs: TickInputs,
        cancel: &CancellationToken,
    ) -> TickOutcome {
        let mut window = self.window.lock().await;

        if cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }
        let published = self.view_tx.borrow().generation;
        if generation <= published {
            return TickOutcome::Stale(generation);
        }

        let price = inputs.state.price;
        if price.is_finite() && price > 0.0 {
            window.append(price);
        }

        let view = ViewModel::build(
            generation,
            self.backend_config(),
            inputs,
            &window,
            (self.clock)(),
            &self.settings,
        );
        self.view_tx.send_replace(Arc::new(view));

        TickOutcome::Applied(generation)
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{AgentEquity, MarketsPayload, ResearchItem, StatePayload};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Scripted backend: each state fetch pops the next price result
    #[derive(Default)]
    struct FakeSource {
        prices: parking_lot::Mutex<VecDeque<Result<f64, FetchError>>>,
        config_failures: AtomicUsize,
        config_calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_prices(prices: Vec<Result<f64, FetchError>>) -> Self {
            Self {
                prices: parking_lot::Mutex::new(prices.into()),
                ..Default::default()
            }
        }
    }

    fn unavailable() -> FetchError {
        FetchError::Http {
            endpoint: "state".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl ForumSource for FakeSource {
        async fn fetch_config(&self) -> Result<BackendConfig, FetchError> {
            self.config_calls.fetch_add(1, Ordering::SeqCst);
            let failures = self.config_failures.load(Ordering::SeqCst);
            if failures > 0 {
                self.config_failures.store(failures - 1, Ordering::SeqCst);
                return Err(FetchError::Status {
                    endpoint: "config".to_string(),
                    status: 503,
                });
            }
            Ok(BackendConfig {
                agent_count: 4,
                model_name: "stub".to_string(),
                ..Default::default()
            })
        }

        async fn fetch_state(&self) -> Result<StatePayload, FetchError> {
            let price = self.prices.lock().pop_front().unwrap_or(Ok(100.0))?;
            Ok(StatePayload {
                price,
                ..Default::default()
            })
        }

        async fn fetch_pnl(&self) -> Result<Vec<AgentEquity>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_research(&self) -> Result<Vec<ResearchItem>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_markets(&self) -> Result<MarketsPayload, FetchError> {
            Ok(MarketsPayload::default())
        }
    }

    fn orchestrator(source: FakeSource, settings: DashboardConfig) -> Orchestrator<FakeSource> {
        Orchestrator::new(source, settings).with_clock(Arc::new(|| 1_000.0))
    }

    fn state_inputs(price: f64) -> TickInputs {
        TickInputs {
            state: StatePayload {
                price,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_previous_view() {
        let source = FakeSource::with_prices(vec![Ok(10.0), Err(unavailable()), Ok(12.0)]);
        let orchestrator = orchestrator(source, DashboardConfig::default());
        let cancel = CancellationToken::new();

        assert!(orchestrator.latest().is_empty());
        assert_eq!(orchestrator.run_tick(&cancel).await, TickOutcome::Applied(1));

        let outcome = orchestrator.run_tick(&cancel).await;
        assert_eq!(outcome, TickOutcome::Failed(unavailable()));
        let view = orchestrator.latest();
        assert_eq!(view.generation, 1);
        assert_eq!(view.price, 10.0);

        // Loop keeps going after a failure
        assert_eq!(orchestrator.run_tick(&cancel).await, TickOutcome::Applied(3));
        let view = orchestrator.latest();
        assert_eq!(view.price, 12.0);
        assert_eq!(view.sparkline.len(), 2);
        assert_eq!(view.price_stats.change, 2.0);
    }

    #[tokio::test]
    async fn test_stale_generation_discarded() {
        let orchestrator = orchestrator(FakeSource::default(), DashboardConfig::default());
        let cancel = CancellationToken::new();

        let older = orchestrator.issue_generation();
        let newer = orchestrator.issue_generation();
        assert!(newer > older);

        assert_eq!(
            orchestrator.complete_tick(newer, state_inputs(20.0), &cancel).await,
            TickOutcome::Applied(newer)
        );
        assert_eq!(
            orchestrator.complete_tick(older, state_inputs(10.0), &cancel).await,
            TickOutcome::Stale(older)
        );

        let view = orchestrator.latest();
        assert_eq!(view.generation, newer);
        assert_eq!(view.price, 20.0);
        // Stale result never reached the window
        assert_eq!(view.sparkline.len(), 1);
    }

    /// First state fetch blocks until released; later fetches answer at once
    #[derive(Default)]
    struct GatedSource {
        release: Arc<tokio::sync::Notify>,
        state_calls: AtomicUsize,
    }

    #[async_trait]
    impl ForumSource for GatedSource {
        async fn fetch_config(&self) -> Result<BackendConfig, FetchError> {
            Ok(BackendConfig::default())
        }

        async fn fetch_state(&self) -> Result<StatePayload, FetchError> {
            let price = if self.state_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
                10.0
            } else {
                20.0
            };
            Ok(StatePayload {
                price,
                ..Default::default()
            })
        }

        async fn fetch_pnl(&self) -> Result<Vec<AgentEquity>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_research(&self) -> Result<Vec<ResearchItem>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_markets(&self) -> Result<MarketsPayload, FetchError> {
            Ok(MarketsPayload::default())
        }
    }

    #[tokio::test]
    async fn test_overlapping_ticks_keep_newest() {
        let source = GatedSource::default();
        let release = Arc::clone(&source.release);
        let orchestrator =
            Orchestrator::new(source, DashboardConfig::default()).with_clock(Arc::new(|| 1_000.0));
        let cancel = CancellationToken::new();

        let slow = orchestrator.run_tick(&cancel);
        let fast = async {
            // Slow tick has claimed generation 1 and is parked in its fetch
            tokio::task::yield_now().await;
            let outcome = orchestrator.run_tick(&cancel).await;
            release.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(fast, TickOutcome::Applied(2));
        assert_eq!(slow, TickOutcome::Stale(1));

        let view = orchestrator.latest();
        assert_eq!(view.generation, 2);
        assert_eq!(view.price, 20.0);
        // Late result never reached the window
        let samples: Vec<f64> = view.sparkline.iter().map(|p| p.value).collect();
        assert_eq!(samples, vec![20.0]);
    }

    #[tokio::test]
    async fn test_cancelled_tick_discarded() {
        let orchestrator = orchestrator(FakeSource::default(), DashboardConfig::default());
        let cancel = CancellationToken::new();
        let receiver = orchestrator.subscribe();

        let generation = orchestrator.issue_generation();
        cancel.cancel();

        assert_eq!(
            orchestrator.complete_tick(generation, state_inputs(10.0), &cancel).await,
            TickOutcome::Cancelled
        );
        assert_eq!(orchestrator.run_tick(&cancel).await, TickOutcome::Cancelled);
        assert!(!receiver.has_changed().unwrap());
        assert!(orchestrator.latest().is_empty());
    }

    #[tokio::test]
    async fn test_window_capped_across_ticks() {
        let prices = (1..=5).map(|p| Ok(p as f64)).collect();
        let settings = DashboardConfig::default().with_price_window(3);
        let orchestrator = orchestrator(FakeSource::with_prices(prices), settings);
        let cancel = CancellationToken::new();

        for _ in 0..5 {
            orchestrator.run_tick(&cancel).await;
        }

        let values: Vec<f64> = orchestrator.latest().sparkline.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_non_positive_price_not_appended() {
        let prices = vec![Ok(10.0), Ok(0.0), Ok(f64::NAN), Ok(-1.0)];
        let orchestrator = orchestrator(FakeSource::with_prices(prices), DashboardConfig::default());
        let cancel = CancellationToken::new();

        for _ in 0..4 {
            orchestrator.run_tick(&cancel).await;
        }

        let view = orchestrator.latest();
        assert_eq!(view.generation, 4);
        assert_eq!(view.price, -1.0);
        assert_eq!(view.sparkline.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_config_fetched_once() {
        let orchestrator = orchestrator(FakeSource::default(), DashboardConfig::default());
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            orchestrator.run_tick(&cancel).await;
        }

        assert_eq!(orchestrator.source.config_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            orchestrator.latest().config.as_ref().map(|c| c.agent_count),
            Some(4)
        );
    }

    #[tokio::test]
    async fn test_backend_config_retried_until_success() {
        let source = FakeSource::default();
        source.config_failures.store(2, Ordering::SeqCst);
        let orchestrator = orchestrator(source, DashboardConfig::default());
        let cancel = CancellationToken::new();

        // Config failure is not fatal for the tick
        assert_eq!(orchestrator.run_tick(&cancel).await, TickOutcome::Applied(1));
        assert!(orchestrator.latest().config.is_none());

        orchestrator.run_tick(&cancel).await;
        orchestrator.run_tick(&cancel).await;
        orchestrator.run_tick(&cancel).await;

        assert_eq!(orchestrator.source.config_calls.load(Ordering::SeqCst), 3);
        assert!(orchestrator.backend_config().is_some());
        assert!(orchestrator.latest().config.is_some());
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let settings = DashboardConfig::default().with_poll_interval(Duration::from_millis(10));
        let orchestrator = Arc::new(orchestrator(FakeSource::default(), settings));
        let mut receiver = orchestrator.subscribe();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            let cancel = cancel.clone();
            async move { orchestrator.run(cancel).await }
        });

        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            while receiver.borrow_and_update().generation < 3 {
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        assert!(reached.is_ok());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let published = orchestrator.latest().generation;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(orchestrator.latest().generation, published);
    }
}
