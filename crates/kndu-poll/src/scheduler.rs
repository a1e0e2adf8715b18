use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use kndu_k8s::NodeFetcher;
use kndu_render::{Render, RenderError};
use kndu_types::{DisplayOptions, FetchError, PrintSnapshot};

/// Time between two poll cycles in watch mode
pub const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Whether to poll once or keep refreshing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    Once,
    Watch,
}

/// What to do when a cycle fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the error to the sink and stop polling
    #[default]
    Fatal,
    /// Log the error and poll again on the next tick
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The single cycle of [`PollMode::Once`] completed
    SingleShot,
    /// The stop token was cancelled
    Cancelled,
    /// A cycle failed under [`ErrorPolicy::Fatal`]
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOutcome {
    /// Cycles started, including a failing one
    pub cycles: u64,
    pub reason: StopReason,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Runs fetch, build and render cycles on a fixed period
pub struct PollScheduler<F, R> {
    fetcher: F,
    renderer: R,
    namespace: String,
    options: DisplayOptions,
    mode: PollMode,
    period: Duration,
    policy: ErrorPolicy,
    state: SchedulerState,
}

impl<F, R> std::fmt::Debug for PollScheduler<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("period", &self.period)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<F: NodeFetcher, R: Render> PollScheduler<F, R> {
    pub fn new(
        fetcher: F,
        renderer: R,
        namespace: impl Into<String>,
        options: DisplayOptions,
        mode: PollMode,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            namespace: namespace.into(),
            options,
            mode,
            period: POLL_PERIOD,
            policy: ErrorPolicy::default(),
            state: SchedulerState::Idle,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Poll until stopped.
    ///
    /// The first cycle runs right away. In watch mode further cycles run on
    /// every tick until `stop` is cancelled or a cycle fails under the fatal
    /// policy. Errors are sent to `errors`.
    pub async fn run(
        &mut self,
        stop: CancellationToken,
        errors: mpsc::Sender<PollError>,
    ) -> PollOutcome {
        let mut cycles = 0;

        let reason = 'poll: {
            cycles += 1;
            // The cycle is polled first so a ready fetch still renders
            let result = tokio::select! {
                biased;

                result = self.cycle() => result,

                _ = stop.cancelled() => break 'poll StopReason::Cancelled,
            };
            if !report(self.policy, result, &errors).await {
                break 'poll StopReason::Failed;
            }

            if self.mode == PollMode::Once {
                break 'poll StopReason::SingleShot;
            }

            self.state = SchedulerState::Running;
            tracing::debug!(period = ?self.period, "watching nodes");

            let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
            // A slow cycle pushes the next tick back instead of bunching ticks up
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = stop.cancelled() => break 'poll StopReason::Cancelled,

                    _ = ticker.tick() => {
                        cycles += 1;
                        let result = tokio::select! {
                            biased;

                            _ = stop.cancelled() => break 'poll StopReason::Cancelled,

                            result = self.cycle() => result,
                        };
                        if !report(self.policy, result, &errors).await {
                            break 'poll StopReason::Failed;
                        }
                    }
                }
            }
        };

        self.state = SchedulerState::Stopped;
        tracing::debug!(cycles, ?reason, "poll scheduler stopped");

        PollOutcome { cycles, reason }
    }

    /// One fetch, build and render pass
    ///
    /// A failed fetch is returned as an error and nothing is drawn.
    async fn cycle(&mut self) -> Result<(), PollError> {
        let nodes = match self.fetcher.fetch(&self.namespace).await {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::debug!(error = %err, "fetch failed");
                return Err(err.into());
            }
        };

        let snapshot =
            PrintSnapshot::build::<FetchError>(&self.namespace, self.options, Ok(nodes));
        self.renderer.render(&snapshot)?;
        Ok(())
    }
}

/// Hand a cycle result to the error policy; returns false when polling must stop
async fn report(
    policy: ErrorPolicy,
    result: Result<(), PollError>,
    errors: &mpsc::Sender<PollError>,
) -> bool {
    let Err(err) = result else {
        return true;
    };

    match policy {
        ErrorPolicy::Fatal => {
            if let Err(mpsc::error::SendError(err)) = errors.send(err).await {
                tracing::error!(error = %err, "error sink closed");
            }
            false
        }
        ErrorPolicy::Continue => {
            tracing::warn!(error = %err, "poll cycle failed, retrying on next tick");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use kndu_types::{NodeRecord, NodeView};

    /// Plays back a fixed list of responses; `None` is a failed fetch.
    /// The last response repeats once the script runs out.
    struct ScriptedFetcher {
        script: Vec<Option<Vec<NodeRecord>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Option<Vec<NodeRecord>>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn healthy() -> Self {
            Self::new(vec![Some(vec![node("worker-1")])])
        }
    }

    impl NodeFetcher for ScriptedFetcher {
        fn fetch<'a>(
            &'a self,
            _namespace: &'a str,
        ) -> BoxFuture<'a, Result<Vec<NodeRecord>, FetchError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self.script[call.min(self.script.len() - 1)].clone();
            async move { response.ok_or_else(|| FetchError::new("connection refused")) }.boxed()
        }
    }

    /// A fetch that never completes, like a request to an unresponsive API server
    struct HangingFetcher;

    impl NodeFetcher for HangingFetcher {
        fn fetch<'a>(
            &'a self,
            _namespace: &'a str,
        ) -> BoxFuture<'a, Result<Vec<NodeRecord>, FetchError>> {
            futures::future::pending().boxed()
        }
    }

    struct RecordingRenderer {
        rendered: mpsc::UnboundedSender<PrintSnapshot>,
        fail: bool,
    }

    impl Render for RecordingRenderer {
        fn render(&mut self, snapshot: &PrintSnapshot) -> Result<(), RenderError> {
            if self.fail {
                return Err(RenderError::MissingNodes);
            }
            let _ = self.rendered.send(snapshot.clone());
            Ok(())
        }
    }

    fn node(name: &str) -> NodeRecord {
        NodeRecord::new(name, "linux", "amd64", "containerd://1.7.2")
    }

    fn recorder() -> (RecordingRenderer, mpsc::UnboundedReceiver<PrintSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let renderer = RecordingRenderer {
            rendered: tx,
            fail: false,
        };
        (renderer, rx)
    }

    fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_runs_single_cycle() {
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            ScriptedFetcher::healthy(),
            renderer,
            "default",
            DisplayOptions::default(),
            PollMode::Once,
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let (err_tx, _err_rx) = mpsc::channel(4);
        let outcome = scheduler.run(CancellationToken::new(), err_tx).await;

        assert_eq!(
            outcome,
            PollOutcome {
                cycles: 1,
                reason: StopReason::SingleShot
            }
        );
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        let snapshots = drain(&mut rendered);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].namespace, "default");
        assert_eq!(snapshots[0].nodes, NodeView::HasNodes(vec![node("worker-1")]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_polls_every_period() {
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            ScriptedFetcher::healthy(),
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        );

        let stop = CancellationToken::new();
        let (err_tx, _err_rx) = mpsc::channel(4);
        let task = tokio::spawn({
            let stop = stop.clone();
            async move {
                let outcome = scheduler.run(stop, err_tx).await;
                (outcome, scheduler.state())
            }
        });

        time::sleep(Duration::from_millis(2500)).await;
        stop.cancel();
        let (outcome, state) = task.await.unwrap();

        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(outcome.cycles >= 2, "cycles: {}", outcome.cycles);
        assert_eq!(state, SchedulerState::Stopped);
        assert_eq!(drain(&mut rendered).len() as u64, outcome.cycles);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick() {
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            ScriptedFetcher::healthy(),
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        );

        let stop = CancellationToken::new();
        stop.cancel();
        let (err_tx, _err_rx) = mpsc::channel(4);
        let outcome = scheduler.run(stop, err_tx).await;

        // The initial cycle always runs
        assert_eq!(outcome.cycles, 1);
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(drain(&mut rendered).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_halts_polling() {
        let fetcher = ScriptedFetcher::new(vec![
            Some(vec![node("worker-1")]),
            None,
            Some(vec![node("worker-1")]),
        ]);
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            fetcher,
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        );

        let (err_tx, mut err_rx) = mpsc::channel(4);
        let outcome = scheduler.run(CancellationToken::new(), err_tx).await;

        assert_eq!(
            outcome,
            PollOutcome {
                cycles: 2,
                reason: StopReason::Failed
            }
        );
        assert_eq!(drain(&mut rendered).len(), 1);
        assert!(matches!(err_rx.try_recv(), Ok(PollError::Fetch(_))));
        assert!(err_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_never_rendered() {
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            ScriptedFetcher::new(vec![None]),
            renderer,
            "default",
            DisplayOptions::default(),
            PollMode::Once,
        );

        let (err_tx, mut err_rx) = mpsc::channel(4);
        let outcome = scheduler.run(CancellationToken::new(), err_tx).await;

        assert_eq!(outcome.reason, StopReason::Failed);
        assert!(drain(&mut rendered).is_empty());
        match err_rx.try_recv() {
            Ok(PollError::Fetch(err)) => assert_eq!(err.message(), "connection refused"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_error_is_fatal() {
        let (mut renderer, mut rendered) = recorder();
        renderer.fail = true;
        let mut scheduler = PollScheduler::new(
            ScriptedFetcher::healthy(),
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        );

        let (err_tx, mut err_rx) = mpsc::channel(4);
        let outcome = scheduler.run(CancellationToken::new(), err_tx).await;

        assert_eq!(outcome.reason, StopReason::Failed);
        assert_eq!(outcome.cycles, 1);
        assert!(drain(&mut rendered).is_empty());
        assert!(matches!(err_rx.try_recv(), Ok(PollError::Render(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_keeps_polling() {
        let fetcher = ScriptedFetcher::new(vec![None, Some(Vec::new())]);
        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            fetcher,
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        )
        .with_error_policy(ErrorPolicy::Continue)
        .with_period(Duration::from_millis(500));

        let stop = CancellationToken::new();
        let (err_tx, mut err_rx) = mpsc::channel(4);
        let task = tokio::spawn({
            let stop = stop.clone();
            async move { scheduler.run(stop, err_tx).await }
        });

        time::sleep(Duration::from_millis(1200)).await;
        stop.cancel();
        let outcome = task.await.unwrap();

        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(err_rx.try_recv().is_err());

        let snapshots = drain(&mut rendered);
        assert!(!snapshots.is_empty());
        assert!(snapshots.iter().all(|s| s.nodes == NodeView::Empty));
    }

    async fn cancel_during_hanging_fetch(mode: PollMode) -> (PollOutcome, SchedulerState) {
        let (renderer, mut rendered) = recorder();
        let mut scheduler =
            PollScheduler::new(HangingFetcher, renderer, "", DisplayOptions::default(), mode);

        let stop = CancellationToken::new();
        let (err_tx, mut err_rx) = mpsc::channel(4);
        let task = tokio::spawn({
            let stop = stop.clone();
            async move {
                let outcome = scheduler.run(stop, err_tx).await;
                (outcome, scheduler.state())
            }
        });

        time::sleep(Duration::from_millis(100)).await;
        stop.cancel();

        let result = time::timeout(Duration::from_secs(60), task)
            .await
            .expect("scheduler did not stop after cancel")
            .unwrap();

        assert!(drain(&mut rendered).is_empty());
        assert!(err_rx.try_recv().is_err());
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hanging_fetch_once() {
        let (outcome, state) = cancel_during_hanging_fetch(PollMode::Once).await;
        assert_eq!(
            outcome,
            PollOutcome {
                cycles: 1,
                reason: StopReason::Cancelled
            }
        );
        assert_eq!(state, SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hanging_fetch_watch() {
        let (outcome, state) = cancel_during_hanging_fetch(PollMode::Watch).await;
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.cycles, 1);
        assert_eq!(state, SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hanging_tick() {
        // First fetch succeeds, every later one hangs
        struct FirstOnly(AtomicUsize);

        impl NodeFetcher for FirstOnly {
            fn fetch<'a>(
                &'a self,
                _namespace: &'a str,
            ) -> BoxFuture<'a, Result<Vec<NodeRecord>, FetchError>> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    async { Ok(vec![node("worker-1")]) }.boxed()
                } else {
                    futures::future::pending().boxed()
                }
            }
        }

        let (renderer, mut rendered) = recorder();
        let mut scheduler = PollScheduler::new(
            FirstOnly(AtomicUsize::new(0)),
            renderer,
            "",
            DisplayOptions::default(),
            PollMode::Watch,
        );

        let stop = CancellationToken::new();
        let (err_tx, _err_rx) = mpsc::channel(4);
        let task = tokio::spawn({
            let stop = stop.clone();
            async move { scheduler.run(stop, err_tx).await }
        });

        // Past the first tick, whose fetch never returns
        time::sleep(Duration::from_millis(1500)).await;
        stop.cancel();

        let outcome = time::timeout(Duration::from_secs(60), task)
            .await
            .expect("scheduler did not stop after cancel")
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome {
                cycles: 2,
                reason: StopReason::Cancelled
            }
        );
        assert_eq!(drain(&mut rendered).len(), 1);
    }
}
