// truth-cli/src/runtime.rs
// ============================================================================
// Module: CLI Runtime Wiring
// Description: Builds the shared collaborators (store, LLM runner, queue,
//              notifier) every subcommand needs from a loaded TruthConfig.
// Purpose: Keep `main.rs` focused on argument parsing and dispatch; this is
//          the one place that turns configuration into live objects.
// Dependencies: truth-config, truth-core, truth-llm, truth-queue,
//              truth-store-sqlite, truth-watchdog
// ============================================================================

//! ## Overview
//! Every subcommand needs the same handful of collaborators: a
//! [`TruthStore`] (which implements every `truth-core`/`truth-llm`
//! repository trait), an [`LlmRunner`] wired to the resolved extraction
//! endpoint, an in-process [`Queue`], and (for `watchdog`) a [`Notifier`].
//! [`Runtime::build`] assembles all of them once per invocation.

use std::sync::Arc;

use thiserror::Error;
use truth_config::TruthConfig;
use truth_llm::HttpLlmTransport;
use truth_llm::LlmRunner;
use truth_llm::LlmTransport;
use truth_llm::ProcessEnv as LlmProcessEnv;
use truth_llm::PromptRegistry;
use truth_llm::RealSleeper;
use truth_llm::Sleeper;
use truth_llm::TransportError;
use truth_llm::resolve_extraction_endpoint;
use truth_queue::InMemoryQueue;
use truth_queue::Queue;
use truth_store_sqlite::SqliteStoreError;
use truth_store_sqlite::TruthStore;
use truth_watchdog::LogNotifier;
use truth_watchdog::Notifier;
use truth_watchdog::SlackNotifier;
use truth_watchdog::WatchdogError;

/// Default HTTP timeout for real LLM chat completions (§5: 60s).
const LLM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Error building the runtime collaborators.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The `SQLite` store could not be opened.
    #[error("failed to open store: {0}")]
    Store(#[from] SqliteStoreError),
    /// The LLM transport could not be constructed.
    #[error("failed to build LLM transport: {0}")]
    Transport(#[from] TransportError),
    /// The Slack notifier could not be constructed.
    #[error("failed to build notifier: {0}")]
    Notifier(#[from] WatchdogError),
}

/// Shared collaborators assembled from a loaded [`TruthConfig`].
pub struct Runtime {
    /// The single `SQLite`-backed store, implementing every repository trait.
    pub store: Arc<TruthStore>,
    /// The LLM runner, wired to the resolved extraction endpoint.
    pub llm: Arc<LlmRunner>,
    /// The resolved extraction endpoint (url, model, api key).
    pub endpoint: String,
    /// The resolved extraction API key, if any.
    pub api_key: Option<String>,
    /// The resolved extraction model name.
    pub model: String,
    /// An in-process job queue (§4.1: no persistent queue backend exists
    /// in this workspace; each CLI invocation starts with an empty queue).
    pub queue: Arc<dyn Queue>,
    /// Batch/backoff sleeper; real time between retries and batch items.
    pub sleeper: Arc<dyn Sleeper>,
}

impl Runtime {
    /// Builds every shared collaborator from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the store cannot be opened or the LLM
    /// transport cannot be constructed.
    pub fn build(config: &TruthConfig) -> Result<Self, RuntimeError> {
        let store = Arc::new(TruthStore::open(config.database.store.clone())?);
        let transport: Arc<dyn LlmTransport> = Arc::new(HttpLlmTransport::new(LLM_TIMEOUT)?);
        let sleeper: Arc<dyn Sleeper> = Arc::new(RealSleeper);
        let endpoint = resolve_extraction_endpoint(&LlmProcessEnv);
        let llm = Arc::new(LlmRunner::new(transport, store.clone(), store.clone(), PromptRegistry::with_default_prompts(), sleeper.clone()));
        let queue: Arc<dyn Queue> = Arc::new(InMemoryQueue::new());

        Ok(Self {
            store,
            llm,
            endpoint: endpoint.endpoint,
            api_key: endpoint.api_key,
            model: endpoint.model,
            queue,
            sleeper,
        })
    }

    /// Builds the [`Notifier`] driven by `watchdog run`, falling back to
    /// logging when no Slack webhook is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if a configured Slack webhook URL is
    /// malformed.
    pub fn notifier(config: &TruthConfig) -> Result<Arc<dyn Notifier>, RuntimeError> {
        match &config.alerting.slack_webhook_url {
            Some(url) => {
                let notifier = SlackNotifier::new(url.clone(), config.alerting.slack_channel.clone())?;
                Ok(Arc::new(notifier))
            }
            None => Ok(Arc::new(LogNotifier)),
        }
    }
}
