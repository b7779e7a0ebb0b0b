//! Per-task graph traversal.

use crate::errors::WalkError;
use crate::model::{Node, NodeKind, WorkflowGraph};
use crate::registry::{ActivityContext, ActivityRegistry};
use gramflow_core_types::{outcome::tags, EventSink, Outcome, RunEvent};
use gramflow_resilience::{classify, ErrorDecision, RetryPolicy};
use gramflow_session::Page;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Traversal knobs.
#[derive(Clone, Debug)]
pub struct WalkerConfig {
    /// Hard ceiling on visited steps; guards against cycles with no exit.
    pub max_steps: u32,
    /// Randomized pause window between node transitions. Deliberate pacing,
    /// not incidental: keeps the account from acting at machine speed.
    pub step_pause: (Duration, Duration),
    /// Backoff policy for transient activity failures.
    pub retry: RetryPolicy,
    /// Long pause window applied on rate-limit signals.
    pub rate_limit_pause: (Duration, Duration),
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_steps: 500,
            step_pause: (Duration::from_secs(1), Duration::from_secs(3)),
            retry: RetryPolicy::default(),
            rate_limit_pause: (Duration::from_secs(30), Duration::from_secs(90)),
        }
    }
}

impl WalkerConfig {
    /// No pauses, immediate retries. For tests.
    pub fn instant() -> Self {
        Self {
            max_steps: 500,
            step_pause: (Duration::ZERO, Duration::ZERO),
            retry: RetryPolicy::immediate(2),
            rate_limit_pause: (Duration::ZERO, Duration::ZERO),
        }
    }
}

/// How a traversal ended, short of an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalkOutcome {
    /// The graph ran out of edges to follow.
    Completed { steps: u32 },
    /// A stop request was honored at a checkpoint.
    Cancelled,
}

/// Walks one workflow graph for one account on one open page.
pub struct GraphWalker {
    registry: Arc<ActivityRegistry>,
    config: WalkerConfig,
}

enum Eval {
    Outcome(Outcome),
    Cancelled,
}

impl GraphWalker {
    pub fn new(registry: Arc<ActivityRegistry>, config: WalkerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Traverse `graph` from its start node until no edge matches, the stop
    /// token fires, or the step ceiling trips.
    pub async fn walk(
        &self,
        graph: &WorkflowGraph,
        page: &dyn Page,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
        events: &dyn EventSink,
    ) -> Result<WalkOutcome, WalkError> {
        let start = graph.start_node().ok_or(WalkError::MissingStartNode)?;
        let mut loop_state: HashMap<String, u32> = HashMap::new();
        let mut steps: u32 = 0;
        let mut current = graph.next_from(&start.id, "");

        while let Some(node) = current {
            if cancel.is_cancelled() {
                info!(profile = %ctx.account.username, "stop requested, leaving traversal");
                return Ok(WalkOutcome::Cancelled);
            }
            steps += 1;
            if steps > self.config.max_steps {
                error!(
                    profile = %ctx.account.username,
                    ceiling = self.config.max_steps,
                    "step ceiling exceeded, aborting runaway traversal"
                );
                return Err(WalkError::StepCeiling(self.config.max_steps));
            }

            let outcome = match self
                .eval_node(node, graph, page, ctx, cancel, events, &mut loop_state)
                .await?
            {
                Eval::Outcome(outcome) => outcome,
                Eval::Cancelled => return Ok(WalkOutcome::Cancelled),
            };
            debug!(
                profile = %ctx.account.username,
                node = %node.id,
                outcome = %outcome,
                "node evaluated"
            );

            current = graph.next_from(&node.id, outcome.as_str());
            if current.is_some() && self.pause_between_steps(cancel).await {
                return Ok(WalkOutcome::Cancelled);
            }
        }

        info!(profile = %ctx.account.username, steps, "traversal completed");
        Ok(WalkOutcome::Completed { steps })
    }

    #[allow(clippy::too_many_arguments)]
    async fn eval_node(
        &self,
        node: &Node,
        graph: &WorkflowGraph,
        page: &dyn Page,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
        events: &dyn EventSink,
        loop_state: &mut HashMap<String, u32>,
    ) -> Result<Eval, WalkError> {
        match node.kind {
            NodeKind::Start => Ok(Eval::Outcome(Outcome::next())),

            NodeKind::Activity => {
                let id = node
                    .data
                    .activity
                    .as_deref()
                    .ok_or_else(|| WalkError::MissingActivityId(node.id.clone()))?;
                let activity = self
                    .registry
                    .get(id)
                    .ok_or_else(|| WalkError::UnregisteredActivity(id.to_string()))?;
                events.emit(RunEvent::task_started(ctx.account.username.as_str(), id));
                self.run_activity(id, activity.as_ref(), node, page, ctx, cancel)
                    .await
            }

            NodeKind::Condition => {
                let check = node.data.config_str("check").unwrap_or("chance");
                match check {
                    "chance" => {
                        let percent = node.data.config_f64("chance_percent", 50.0);
                        let hit = {
                            let mut rng = rand::thread_rng();
                            rng.gen_range(0.0..100.0) < percent
                        };
                        let tag = if hit { tags::TRUE } else { tags::FALSE };
                        Ok(Eval::Outcome(Outcome::new(tag)))
                    }
                    other => Err(WalkError::UnknownCondition {
                        node: node.id.clone(),
                        check: other.to_string(),
                    }),
                }
            }

            NodeKind::Loop => {
                let iterations = node.data.config_u32("iterations", 1).max(1);
                let done = loop_state.entry(node.id.clone()).or_insert(0);
                if *done + 1 < iterations {
                    *done += 1;
                    Ok(Eval::Outcome(Outcome::new(tags::LOOP)))
                } else {
                    *done = 0;
                    Ok(Eval::Outcome(Outcome::new(tags::DONE)))
                }
            }

            NodeKind::RandomBranch => {
                let handles = graph.handles_from(&node.id);
                if handles.is_empty() {
                    // Nothing to branch between; fall through the default edge.
                    return Ok(Eval::Outcome(Outcome::next()));
                }
                let idx = {
                    let mut rng = rand::thread_rng();
                    let weights = parse_weights(node.data.config_str("weights"), handles.len());
                    choose_index(&mut rng, handles.len(), weights.as_deref())
                };
                Ok(Eval::Outcome(Outcome::new(handles[idx].clone())))
            }

            NodeKind::Delay => {
                let min = node.data.config_f64("min_seconds", 1.0).max(0.0);
                let max = node.data.config_f64("max_seconds", min).max(min);
                let duration = {
                    let mut rng = rand::thread_rng();
                    if max > min {
                        Duration::from_secs_f64(rng.gen_range(min..max))
                    } else {
                        Duration::from_secs_f64(min)
                    }
                };
                if cancellable_sleep(duration, cancel).await {
                    return Ok(Eval::Cancelled);
                }
                Ok(Eval::Outcome(Outcome::next()))
            }
        }
    }

    /// Invoke one activity with the resilience policy wrapped around it:
    /// transient failures retry with backoff, rate limits sleep long without
    /// consuming budget, everything else bubbles to the caller classified.
    async fn run_activity(
        &self,
        id: &str,
        activity: &dyn crate::registry::Activity,
        node: &Node,
        page: &dyn Page,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Eval, WalkError> {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Ok(Eval::Cancelled);
            }
            match activity.run(page, &node.data.config, ctx, cancel).await {
                Ok(outcome) => return Ok(Eval::Outcome(outcome)),
                Err(err) => {
                    if err.is_context_closed() && cancel.is_cancelled() {
                        // The stop request tore the browser down mid-step.
                        info!(
                            profile = %ctx.account.username,
                            activity = id,
                            "context closed by stop request, treating as cancellation"
                        );
                        return Ok(Eval::Cancelled);
                    }
                    match classify(&err) {
                        ErrorDecision::Retry if attempt < self.config.retry.max_retries => {
                            let delay = self.config.retry.delay_for(attempt);
                            warn!(
                                profile = %ctx.account.username,
                                activity = id,
                                attempt = attempt + 1,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "transient activity failure, backing off"
                            );
                            if cancellable_sleep(delay, cancel).await {
                                return Ok(Eval::Cancelled);
                            }
                            attempt += 1;
                        }
                        ErrorDecision::BackoffAndSlow => {
                            let (lo, hi) = self.config.rate_limit_pause;
                            let pause = {
                                let mut rng = rand::thread_rng();
                                if hi > lo {
                                    Duration::from_secs_f64(
                                        rng.gen_range(lo.as_secs_f64()..hi.as_secs_f64()),
                                    )
                                } else {
                                    lo
                                }
                            };
                            warn!(
                                profile = %ctx.account.username,
                                activity = id,
                                pause_secs = pause.as_secs(),
                                "rate limit signalled, slowing down"
                            );
                            if cancellable_sleep(pause, cancel).await {
                                return Ok(Eval::Cancelled);
                            }
                        }
                        _ => {
                            return Err(WalkError::Activity {
                                node: node.id.clone(),
                                source: err,
                            })
                        }
                    }
                }
            }
        }
    }

    /// Randomized pause between node transitions. True when cancelled.
    async fn pause_between_steps(&self, cancel: &CancellationToken) -> bool {
        let (lo, hi) = self.config.step_pause;
        if hi.is_zero() {
            return cancel.is_cancelled();
        }
        let pause = {
            let mut rng = rand::thread_rng();
            if hi > lo {
                Duration::from_secs_f64(rng.gen_range(lo.as_secs_f64()..hi.as_secs_f64()))
            } else {
                lo
            }
        };
        cancellable_sleep(pause, cancel).await
    }
}

/// Sleep unless the stop token fires first. True when cancelled.
async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Parse a comma-separated weight string. `None` unless every entry is a
/// finite non-negative number, the count matches the handle count, and the
/// sum is positive — malformed weights degrade to uniform choice, never
/// raise.
fn parse_weights(raw: Option<&str>, expected: usize) -> Option<Vec<f64>> {
    let raw = raw?;
    let parsed: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parsed.len() != expected {
        return None;
    }
    if !parsed.iter().all(|w| w.is_finite() && *w >= 0.0) {
        return None;
    }
    if parsed.iter().sum::<f64>() <= 0.0 {
        return None;
    }
    Some(parsed)
}

/// Weighted draw over `n` choices; uniform when no valid weights.
fn choose_index<R: Rng>(rng: &mut R, n: usize, weights: Option<&[f64]>) -> usize {
    match weights {
        Some(weights) => {
            let total: f64 = weights.iter().sum();
            let mut draw = rng.gen_range(0.0..total);
            for (i, w) in weights.iter().enumerate() {
                if draw < *w {
                    return i;
                }
                draw -= w;
            }
            n - 1
        }
        None => rng.gen_range(0..n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node, NodeData};
    use crate::registry::Activity;
    use async_trait::async_trait;
    use gramflow_core_types::{Account, ActivityError, NullSink};
    use gramflow_session::sim::SimPage;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Map, Value};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            kind,
            data: NodeData::default(),
        }
    }

    fn activity_node(id: &str, activity: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Activity,
            data: NodeData {
                activity: Some(activity.to_string()),
                config: Map::new(),
            },
        }
    }

    fn edge(source: &str, target: &str, handle: Option<&str>) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: handle.map(String::from),
        }
    }

    fn ctx() -> ActivityContext {
        ActivityContext::new(Account::new("tester"))
    }

    /// Records invocations and returns a fixed tag.
    struct Recording {
        tag: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        name: &'static str,
    }

    #[async_trait]
    impl Activity for Recording {
        async fn run(
            &self,
            _page: &dyn Page,
            _config: &Map<String, Value>,
            _ctx: &ActivityContext,
            _cancel: &CancellationToken,
        ) -> Result<Outcome, ActivityError> {
            self.calls.lock().push(self.name.to_string());
            Ok(Outcome::new(self.tag))
        }
    }

    struct FailingThen {
        failures: Mutex<u32>,
        error: fn() -> ActivityError,
        calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl Activity for FailingThen {
        async fn run(
            &self,
            _page: &dyn Page,
            _config: &Map<String, Value>,
            _ctx: &ActivityContext,
            _cancel: &CancellationToken,
        ) -> Result<Outcome, ActivityError> {
            *self.calls.lock() += 1;
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                Err((self.error)())
            } else {
                Ok(Outcome::success())
            }
        }
    }

    fn walker_with(calls: &Arc<Mutex<Vec<String>>>) -> GraphWalker {
        let mut registry = ActivityRegistry::new();
        registry.register(
            "act_a",
            Arc::new(Recording {
                tag: "success",
                calls: Arc::clone(calls),
                name: "A",
            }),
        );
        registry.register(
            "act_b",
            Arc::new(Recording {
                tag: "success",
                calls: Arc::clone(calls),
                name: "B",
            }),
        );
        GraphWalker::new(Arc::new(registry), WalkerConfig::instant())
    }

    #[tokio::test]
    async fn deterministic_walk_visits_expected_nodes() {
        // start -> A -> C -[true]-> B, C -[false]-> end. Condition with
        // chance 100 always answers true, so the visit order is A then B.
        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);

        let mut condition = node("c", NodeKind::Condition);
        condition.data.config = serde_json::from_value(json!({"chance_percent": 100})).unwrap();

        let graph = WorkflowGraph {
            nodes: vec![
                node("s", NodeKind::Start),
                activity_node("a", "act_a"),
                condition,
                activity_node("b", "act_b"),
                activity_node("end", "act_a"),
            ],
            edges: vec![
                edge("s", "a", None),
                edge("a", "c", None),
                edge("c", "b", Some("true")),
                edge("c", "end", Some("false")),
            ],
        };

        let page = SimPage::new();
        let outcome = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap();

        assert!(matches!(outcome, WalkOutcome::Completed { .. }));
        assert_eq!(*calls.lock(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn loop_node_runs_body_iterations_minus_one_times_then_exits() {
        // loop(iterations=3) -[loop]-> A -> loop, -[done]-> B.
        // "loop" twice, "done" on the third evaluation.
        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);

        let mut l = node("l", NodeKind::Loop);
        l.data.config = serde_json::from_value(json!({"iterations": 3})).unwrap();

        let graph = WorkflowGraph {
            nodes: vec![
                node("s", NodeKind::Start),
                l,
                activity_node("a", "act_a"),
                activity_node("b", "act_b"),
            ],
            edges: vec![
                edge("s", "l", None),
                edge("l", "a", Some("loop")),
                edge("a", "l", None),
                edge("l", "b", Some("done")),
            ],
        };

        let page = SimPage::new();
        let token = CancellationToken::new();
        walker
            .walk(&graph, &page, &ctx(), &token, &NullSink)
            .await
            .unwrap();
        assert_eq!(*calls.lock(), vec!["A", "A", "B"]);

        // Counter reset: a second traversal needs all three evaluations again.
        calls.lock().clear();
        walker
            .walk(&graph, &page, &ctx(), &token, &NullSink)
            .await
            .unwrap();
        assert_eq!(*calls.lock(), vec!["A", "A", "B"]);
    }

    #[tokio::test]
    async fn step_ceiling_aborts_cyclic_graph() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut walker = walker_with(&calls);
        walker.config.max_steps = 10;

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("a", "act_a")],
            edges: vec![edge("s", "a", None), edge("a", "a", None)],
        };

        let page = SimPage::new();
        let err = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::StepCeiling(10)));
    }

    #[tokio::test]
    async fn unregistered_activity_fails_loud() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("x", "nope")],
            edges: vec![edge("s", "x", None)],
        };

        let page = SimPage::new();
        let err = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::UnregisteredActivity(id) if id == "nope"));
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let attempts = Arc::new(Mutex::new(0));
        let mut registry = ActivityRegistry::new();
        registry.register(
            "flaky",
            Arc::new(FailingThen {
                failures: Mutex::new(2),
                error: || ActivityError::Timeout("slow feed".into()),
                calls: Arc::clone(&attempts),
            }),
        );
        let walker = GraphWalker::new(Arc::new(registry), WalkerConfig::instant());

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("f", "flaky")],
            edges: vec![edge("s", "f", None)],
        };

        let page = SimPage::new();
        walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap();
        assert_eq!(*attempts.lock(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_activity_error() {
        let attempts = Arc::new(Mutex::new(0));
        let mut registry = ActivityRegistry::new();
        registry.register(
            "flaky",
            Arc::new(FailingThen {
                failures: Mutex::new(10),
                error: || ActivityError::Network("reset".into()),
                calls: Arc::clone(&attempts),
            }),
        );
        let walker = GraphWalker::new(Arc::new(registry), WalkerConfig::instant());

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("f", "flaky")],
            edges: vec![edge("s", "f", None)],
        };

        let page = SimPage::new();
        let err = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::Activity { .. }));
        // max_retries = 2 in the instant config: 3 calls total.
        assert_eq!(*attempts.lock(), 3);
    }

    #[tokio::test]
    async fn fatal_error_aborts_without_retry() {
        let attempts = Arc::new(Mutex::new(0));
        let mut registry = ActivityRegistry::new();
        registry.register(
            "doomed",
            Arc::new(FailingThen {
                failures: Mutex::new(10),
                error: || ActivityError::Fatal("login required".into()),
                calls: Arc::clone(&attempts),
            }),
        );
        let walker = GraphWalker::new(Arc::new(registry), WalkerConfig::instant());

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("d", "doomed")],
            edges: vec![edge("s", "d", None)],
        };

        let page = SimPage::new();
        let err = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap_err();
        assert!(matches!(
            err.activity_error(),
            Some(ActivityError::Fatal(_))
        ));
        assert_eq!(*attempts.lock(), 1);
    }

    #[tokio::test]
    async fn context_closed_during_stop_is_clean_cancellation() {
        struct ClosedPage;

        #[async_trait]
        impl Activity for ClosedPage {
            async fn run(
                &self,
                _page: &dyn Page,
                _config: &Map<String, Value>,
                _ctx: &ActivityContext,
                cancel: &CancellationToken,
            ) -> Result<Outcome, ActivityError> {
                cancel.cancel();
                Err(ActivityError::ContextClosed)
            }
        }

        let mut registry = ActivityRegistry::new();
        registry.register("closer", Arc::new(ClosedPage));
        let walker = GraphWalker::new(Arc::new(registry), WalkerConfig::instant());

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("c", "closer")],
            edges: vec![edge("s", "c", None)],
        };

        let page = SimPage::new();
        let outcome = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Cancelled);
    }

    #[tokio::test]
    async fn pre_cancelled_token_walks_nothing() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);

        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("a", "act_a")],
            edges: vec![edge("s", "a", None)],
        };

        let token = CancellationToken::new();
        token.cancel();
        let page = SimPage::new();
        let outcome = walker
            .walk(&graph, &page, &ctx(), &token, &NullSink)
            .await
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Cancelled);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn malformed_weights_fall_back_to_uniform() {
        assert!(parse_weights(Some("abc,2"), 2).is_none());
        assert!(parse_weights(Some("1,2,3"), 2).is_none());
        assert!(parse_weights(Some("0,0"), 2).is_none());
        assert!(parse_weights(None, 2).is_none());
        assert_eq!(parse_weights(Some("3, 1"), 2), Some(vec![3.0, 1.0]));

        // Uniform fallback still reaches every branch and never panics.
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 2];
        for _ in 0..100 {
            seen[choose_index(&mut rng, 2, None)] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn weighted_choice_respects_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let weights = [1.0, 0.0];
        for _ in 0..50 {
            assert_eq!(choose_index(&mut rng, 2, Some(&weights)), 0);
        }
    }

    #[tokio::test]
    async fn random_branch_with_malformed_weights_still_branches() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);

        let mut branch = node("r", NodeKind::RandomBranch);
        branch.data.config = serde_json::from_value(json!({"weights": "abc,2"})).unwrap();

        let graph = WorkflowGraph {
            nodes: vec![
                node("s", NodeKind::Start),
                branch,
                activity_node("a", "act_a"),
                activity_node("b", "act_b"),
            ],
            edges: vec![
                edge("s", "r", None),
                edge("r", "a", Some("path_a")),
                edge("r", "b", Some("path_b")),
            ],
        };

        let page = SimPage::new();
        let outcome = walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &NullSink)
            .await
            .unwrap();
        assert!(matches!(outcome, WalkOutcome::Completed { .. }));
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn task_started_is_emitted_per_activity() {
        #[derive(Default)]
        struct Collector(Mutex<Vec<RunEvent>>);
        impl EventSink for Collector {
            fn emit(&self, event: RunEvent) {
                self.0.lock().push(event);
            }
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        let walker = walker_with(&calls);
        let graph = WorkflowGraph {
            nodes: vec![node("s", NodeKind::Start), activity_node("a", "act_a")],
            edges: vec![edge("s", "a", None)],
        };

        let sink = Collector::default();
        let page = SimPage::new();
        walker
            .walk(&graph, &page, &ctx(), &CancellationToken::new(), &sink)
            .await
            .unwrap();

        let events = sink.0.lock();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RunEvent::TaskStarted { task, profile, .. } if task == "act_a" && profile == "tester"
        ));
    }
}
