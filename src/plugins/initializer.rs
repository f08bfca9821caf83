//! Concurrent plugin initialization
//!
//! Every pair's `init` goes to the blocking pool as its own task. Scheduling
//! returns at once; a failing or panicking plugin only marks its own pair as
//! failed.

use crate::core::{HttpProxy, PublicApi};
use crate::plugins::plugin::{InitState, PluginInitContext, PluginPair};
use crate::{log_debug, log_error, log_warn};
use futures::future::join_all;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Outcome of one load pass's initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitSummary {
    pub ready: Vec<String>,
    pub failed: Vec<String>,
}

/// Handle on the init tasks of one load pass
///
/// Dropping it does not cancel anything; the tasks run to completion either way.
#[derive(Debug)]
pub struct InitProgress {
    tasks: Vec<(String, JoinHandle<InitState>)>,
}

impl InitProgress {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every init task of the pass to finish
    pub async fn wait(self) -> InitSummary {
        let (ids, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let mut summary = InitSummary::default();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(InitState::Ready) => summary.ready.push(id),
                _ => summary.failed.push(id),
            }
        }
        summary
    }
}

/// Schedule `init` for every pair on `handle`'s blocking pool
///
/// Each plugin gets its own context; `proxy` and `api` are shared.
pub fn initialize_plugins(
    pairs: &[PluginPair],
    proxy: Arc<HttpProxy>,
    api: Arc<dyn PublicApi>,
    handle: &Handle,
) -> InitProgress {
    let tasks = pairs
        .iter()
        .map(|pair| {
            let pair = pair.clone();
            let context = PluginInitContext {
                current_plugin_metadata: Arc::clone(&pair.metadata),
                proxy: Arc::clone(&proxy),
                api: Arc::clone(&api),
            };
            let id = pair.id().to_string();
            (id, handle.spawn_blocking(move || run_init(&pair, context)))
        })
        .collect();

    InitProgress { tasks }
}

fn run_init(pair: &PluginPair, context: PluginInitContext) -> InitState {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| pair.plugin.init(&context)));

    let state = match outcome {
        Ok(Ok(())) => {
            log_debug!(
                "Plugin '{}' initialized in {}ms",
                pair.id(),
                started.elapsed().as_millis()
            );
            InitState::Ready
        }
        Ok(Err(e)) => {
            log_warn!("Plugin '{}' failed to initialize: {}", pair.id(), e);
            InitState::Failed(e.to_string())
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            log_error!("Plugin '{}' panicked during initialization: {}", pair.id(), reason);
            InitState::Failed(reason)
        }
    };

    pair.set_init_state(state.clone());
    state
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
