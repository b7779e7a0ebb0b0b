//! Concurrent execution of one workflow graph across many profiles.

use crate::eligibility::{Eligibility, EligibilityGate};
use crate::options::RunOptions;
use gramflow_core_types::{
    Account, CompletionStatus, EventSink, Identity, ProfileRecord, ProfileStatus, RunEvent, RunId,
    SessionStatus, TargetAccount, TargetStatus,
};
use gramflow_resilience::{classify, ErrorDecision};
use gramflow_session::{LaunchSpec, SessionFactory};
use gramflow_state_client::{StateStore, StateStoreError};
use gramflow_workflow::{ActivityContext, GraphWalker, WalkOutcome, WorkflowGraph};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Coarse process outcome, mapped onto the exit code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunExit {
    /// Ran to completion or stopped cleanly.
    Completed,
    /// Bad input: empty account list, invalid graph. Nothing was submitted.
    ConfigError,
    /// Something outside the per-account error handling went wrong.
    Failed,
}

impl RunExit {
    pub fn code(self) -> i32 {
        match self {
            RunExit::Completed => 0,
            RunExit::ConfigError => 2,
            RunExit::Failed => 1,
        }
    }
}

/// Everything one account task needs, cheap to clone into the pool.
#[derive(Clone)]
struct TaskCtx {
    store: Arc<dyn StateStore>,
    sessions: Arc<SessionFactory>,
    walker: Arc<GraphWalker>,
    events: Arc<dyn EventSink>,
    options: RunOptions,
    cancel: CancellationToken,
    cache: Arc<Mutex<HashMap<String, ProfileRecord>>>,
    graph: Arc<WorkflowGraph>,
}

/// Owns the worker pool and the run lifecycle.
///
/// One cycle: gate each account, submit one task per eligible account to a
/// semaphore-bounded pool, join them all, report. A failure inside one
/// account's task never reaches another task or this control loop.
pub struct WorkflowRunner {
    store: Arc<dyn StateStore>,
    sessions: Arc<SessionFactory>,
    walker: Arc<GraphWalker>,
    events: Arc<dyn EventSink>,
    options: RunOptions,
    cancel: CancellationToken,
    profile_cache: Arc<Mutex<HashMap<String, ProfileRecord>>>,
}

impl WorkflowRunner {
    pub fn new(
        store: Arc<dyn StateStore>,
        sessions: Arc<SessionFactory>,
        walker: GraphWalker,
        events: Arc<dyn EventSink>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            sessions,
            walker: Arc::new(walker),
            events,
            options,
            cancel: CancellationToken::new(),
            profile_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Token the CLI hooks its signal handler to.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a cooperative stop. In-flight browser operations finish
    /// their current call; every loop exits at its next checkpoint.
    pub fn stop(&self) {
        info!("stop requested");
        self.cancel.cancel();
    }

    /// Run the graph for every account, blocking until all submitted tasks
    /// finish or a stop request has drained them.
    pub async fn run(&self, accounts: Vec<Account>, graph: WorkflowGraph) -> RunExit {
        if accounts.is_empty() {
            error!("no accounts to run");
            return RunExit::ConfigError;
        }
        if let Err(err) = graph.validate() {
            error!(error = %err, "workflow graph rejected");
            return RunExit::ConfigError;
        }

        self.events.emit(RunEvent::session_started());
        let graph = Arc::new(graph);
        let run_id = RunId::new();
        let workers = self.options.worker_count(accounts.len());
        info!(
            run = %run_id,
            accounts = accounts.len(),
            workers,
            "submitting account tasks"
        );
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut tasks = JoinSet::new();
        for account in accounts {
            let ctx = TaskCtx {
                store: Arc::clone(&self.store),
                sessions: Arc::clone(&self.sessions),
                walker: Arc::clone(&self.walker),
                events: Arc::clone(&self.events),
                options: self.options.clone(),
                cancel: self.cancel.clone(),
                cache: Arc::clone(&self.profile_cache),
                graph: Arc::clone(&graph),
            };
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                run_account(ctx, account).await;
            });
        }

        let mut aborted = 0u32;
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                aborted += 1;
                error!(error = %err, "account task aborted");
            }
        }

        let status = if aborted > 0 {
            SessionStatus::Failed
        } else if self.cancel.is_cancelled() {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        self.events.emit(RunEvent::session_ended(status));
        match status {
            SessionStatus::Failed => RunExit::Failed,
            _ => RunExit::Completed,
        }
    }
}

/// One account's full cycle: gate, mark running, traverse, restore idle.
async fn run_account(ctx: TaskCtx, account: Account) {
    let name = account.username.clone();
    if ctx.cancel.is_cancelled() {
        return;
    }

    let profile = match lookup_profile(&ctx, &name).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!(profile = %name, "no profile record in store, skipping");
            return;
        }
        Err(err) => {
            // Correctness depends on the record; this one is a hard skip.
            warn!(profile = %name, error = %err, "profile fetch failed, skipping");
            return;
        }
    };

    let gate = EligibilityGate::new(Arc::clone(&ctx.store), ctx.options.clone());
    let messaging_only = ctx.graph.is_messaging_only();
    let message_targets = match gate.check(&profile, messaging_only).await {
        Eligibility::Eligible { message_targets } => message_targets,
        Eligibility::Skip(reason) => {
            info!(profile = %name, %reason, "account skipped this cycle");
            return;
        }
    };

    // Follow workflows work through the profile's assigned accounts.
    let follow_targets = if ctx.graph.has_activity("follow_user") {
        match ctx
            .store
            .get_accounts_for_profile(&profile.profile_id, Some(TargetStatus::Assigned))
            .await
        {
            Ok(targets) => targets,
            Err(err) => {
                warn!(profile = %name, error = %err, "could not fetch follow targets");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    ctx.events.emit(RunEvent::profile_started(name.as_str()));
    if let Err(err) = ctx
        .store
        .sync_profile_status(&name, ProfileStatus::Running, true)
        .await
    {
        warn!(profile = %name, error = %err, "could not mark profile running");
    }

    let status =
        run_session_cycle(&ctx, &account, &profile, &message_targets, &follow_targets).await;

    // The one invariant that must hold on every exit path: whatever
    // happened above, the profile ends idle.
    if let Err(err) = ctx
        .store
        .sync_profile_status(&name, ProfileStatus::Idle, false)
        .await
    {
        error!(profile = %name, error = %err, "failed to restore idle status");
    }
    ctx.events
        .emit(RunEvent::profile_completed(name.as_str(), status));
}

/// Acquire a session and walk the graph, restarting once per budget unit
/// when the browser itself is lost.
async fn run_session_cycle(
    ctx: &TaskCtx,
    account: &Account,
    profile: &ProfileRecord,
    message_targets: &[TargetAccount],
    follow_targets: &[TargetAccount],
) -> CompletionStatus {
    let mut restarts_left = ctx.options.restart_budget;
    loop {
        if ctx.cancel.is_cancelled() {
            return CompletionStatus::Cancelled;
        }

        let spec = LaunchSpec::new(profile.name.clone())
            .with_proxy(account.proxy.clone().or_else(|| profile.proxy.clone()))
            .with_identity(Identity {
                user_agent: profile.user_agent.clone(),
                validate_geolocation: true,
            });
        let session = match ctx.sessions.acquire(spec).await {
            Ok(session) => session,
            Err(err) => {
                warn!(profile = %profile.name, error = %err, "session acquisition failed");
                return CompletionStatus::Failed;
            }
        };
        let page = match session.page() {
            Ok(page) => page,
            Err(err) => {
                warn!(profile = %profile.name, error = %err, "no page on fresh session");
                return CompletionStatus::Failed;
            }
        };

        let mut walk_ctx = ActivityContext::new(account.clone());
        for (key, targets) in [
            ("message_targets", message_targets),
            ("follow_targets", follow_targets),
        ] {
            if targets.is_empty() {
                continue;
            }
            match serde_json::to_value(targets) {
                Ok(value) => {
                    walk_ctx.data.insert(key.to_string(), value);
                }
                Err(err) => warn!(error = %err, key, "could not encode targets"),
            }
        }

        let result = ctx
            .walker
            .walk(
                &ctx.graph,
                page.as_ref(),
                &walk_ctx,
                &ctx.cancel,
                ctx.events.as_ref(),
            )
            .await;
        if let Err(err) = session.close().await {
            warn!(profile = %profile.name, error = %err, "session close failed");
        }

        match result {
            Ok(WalkOutcome::Completed { steps }) => {
                record_success(ctx, profile, message_targets).await;
                info!(profile = %profile.name, steps, "profile task completed");
                return CompletionStatus::Success;
            }
            Ok(WalkOutcome::Cancelled) => return CompletionStatus::Cancelled,
            Err(err) => {
                let wants_restart = err.activity_error().map(classify)
                    == Some(ErrorDecision::RestartBrowser);
                if wants_restart && restarts_left > 0 {
                    restarts_left -= 1;
                    warn!(
                        profile = %profile.name,
                        error = %err,
                        restarts_left,
                        "browser lost, acquiring a fresh session and resuming from the start node"
                    );
                    continue;
                }
                error!(profile = %profile.name, error = %err, "traversal failed");
                return CompletionStatus::Failed;
            }
        }
    }
}

/// Post-success bookkeeping: bump the daily counter (mirrored into the
/// local cache so this run does not re-read a stale value) and stamp the
/// messaging targets that were handed to the traversal.
async fn record_success(ctx: &TaskCtx, profile: &ProfileRecord, targets: &[TargetAccount]) {
    match ctx.store.increment_sessions_today(&profile.profile_id).await {
        Ok(count) => {
            if let Some(cached) = ctx.cache.lock().get_mut(&profile.name) {
                cached.sessions_today = count;
            }
        }
        Err(err) => {
            warn!(profile = %profile.name, error = %err, "failed to bump session counter")
        }
    }

    for target in targets {
        if let Err(err) = ctx.store.set_last_message_sent_now(&target.id).await {
            warn!(target = %target.username, error = %err, "failed to stamp message time");
        }
        if let Err(err) = ctx
            .store
            .update_account_status(&target.id, TargetStatus::Done, Some(&profile.profile_id))
            .await
        {
            warn!(target = %target.username, error = %err, "failed to update target status");
        }
    }
}

/// Read-through profile lookup shared by all tasks in a run.
async fn lookup_profile(
    ctx: &TaskCtx,
    name: &str,
) -> Result<Option<ProfileRecord>, StateStoreError> {
    if let Some(profile) = ctx.cache.lock().get(name) {
        return Ok(Some(profile.clone()));
    }
    let fetched = ctx.store.get_profile_by_name(name).await?;
    if let Some(profile) = &fetched {
        ctx.cache.lock().insert(name.to_string(), profile.clone());
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_contract() {
        assert_eq!(RunExit::Completed.code(), 0);
        assert_eq!(RunExit::ConfigError.code(), 2);
        assert_eq!(RunExit::Failed.code(), 1);
    }
}
