//! CLI harness around the gramflow engine.
//!
//! The binary reads a JSON run payload from stdin (or a file), wires the
//! engine together, streams lifecycle events as newline-delimited JSON on
//! stdout, and logs human-readable lines on stderr. The GUI front-end
//! spawns it as a one-shot subprocess and watches the event stream.

pub mod payload;
pub mod settings;
pub mod sink;

pub use payload::{AccountSpec, RunPayload};
pub use settings::Settings;
pub use sink::NdjsonSink;

use gramflow_core_types::EventSink;
use gramflow_runner::{RunOptions, WorkflowRunner};
use gramflow_session::{BrowserBackend, SessionConfig, SessionFactory};
use gramflow_state_client::StateStore;
use gramflow_workflow::{ActivityRegistry, GraphWalker};
use std::sync::Arc;

/// Assemble a runner from its collaborators with the default activity set.
pub fn build_runner(
    store: Arc<dyn StateStore>,
    backend: Arc<dyn BrowserBackend>,
    events: Arc<dyn EventSink>,
    options: RunOptions,
    session_config: SessionConfig,
) -> WorkflowRunner {
    let mut registry = ActivityRegistry::new();
    gramflow_activities::register_defaults(&mut registry);

    let factory = Arc::new(SessionFactory::new(
        backend,
        Arc::new(gramflow_resilience::ProxyHealthRegistry::new(
            3,
            std::time::Duration::from_secs(600),
        )),
        Arc::new(gramflow_resilience::CircuitBreaker::new(
            5,
            std::time::Duration::from_secs(60),
        )),
        session_config,
    ));

    let walker = GraphWalker::new(Arc::new(registry), options.walker_config());
    WorkflowRunner::new(store, factory, walker, events, options)
}
