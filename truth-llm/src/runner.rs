// truth-llm/src/runner.rs
// ============================================================================
// Module: LLM Runner
// Description: Implements the C3 contract end to end (§4.2).
// Purpose: One call site (`LlmRunner::run`) that every pipeline stage (C5-C7)
//          invokes instead of talking to `LlmTransport` directly, so prompt
//          rendering, circuit breaking, retry/backoff, JSON extraction, and
//          AgentRun recording happen exactly once.
// Dependencies: truth-core, truth-queue, crate::{circuit_breaker, env,
//              error, parse, prompt, transport}
// ============================================================================

//! ## Overview
//! [`LlmRunner::run`] is §4.2's eight-step contract: validate input, look up
//! the prompt, gate on the circuit breaker, call the transport, extract and
//! validate JSON, record the `AgentRun`, and retry with classified backoff
//! on any failure before validation succeeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use time::OffsetDateTime;
use truth_core::AgentRun;
use truth_core::AgentRunId;
use truth_core::AgentRunRepository;
use truth_core::JobId;
use truth_core::RunId;
use truth_queue::backoff_delay_ms;

use crate::circuit_breaker::CircuitBreakerStore;
use crate::circuit_breaker::load_or_init;
use crate::error::RunnerError;
use crate::error::TransportError;
use crate::parse::extract_json_object;
use crate::prompt::AgentType;
use crate::prompt::PromptRegistry;
use crate::prompt::render_user_message;
use crate::transport::ChatMessage;
use crate::transport::ChatOptions;
use crate::transport::ChatRequest;
use crate::transport::LlmTransport;

// ============================================================================
// SECTION: Validator Trait
// ============================================================================

/// Validates a `serde_json::Value` against a named schema.
///
/// `truth-llm` has no JSON Schema engine dependency of its own; callers
/// inject one (or a hand-written predicate) so input/output validation stays
/// swappable, mirroring how [`LlmTransport`] keeps the HTTP client
/// swappable.
pub trait SchemaValidator: Send + Sync {
    /// Validates `value`, returning a description of the first failure.
    ///
    /// # Errors
    ///
    /// Returns `Err` with a human-readable message on validation failure.
    fn validate(&self, value: &serde_json::Value) -> Result<(), String>;
}

/// A [`SchemaValidator`] that accepts every input; useful in tests and for
/// agent types that do not constrain their input/output shape further than
/// "is a JSON object".
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl SchemaValidator for AcceptAllValidator {
    fn validate(&self, _value: &serde_json::Value) -> Result<(), String> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Sleeper Trait
// ============================================================================

/// Abstracts the backoff sleep so tests can run retry loops instantaneously.
pub trait Sleeper: Send + Sync {
    /// Blocks for `millis` milliseconds.
    fn sleep_ms(&self, millis: u64);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep_ms(&self, millis: u64) {
        std::thread::sleep(std::time::Duration::from_millis(millis));
    }
}

/// [`Sleeper`] that records requested durations without blocking.
#[derive(Debug, Default)]
pub struct NoopSleeper {
    /// Durations requested, in call order.
    pub requested_ms: std::sync::Mutex<Vec<u64>>,
}

impl Sleeper for NoopSleeper {
    fn sleep_ms(&self, millis: u64) {
        if let Ok(mut requested) = self.requested_ms.lock() {
            requested.push(millis);
        }
    }
}

// ============================================================================
// SECTION: Run Request / Outcome
// ============================================================================

/// Input to [`LlmRunner::run`] (§4.2).
pub struct RunRequest<'a> {
    /// Which stage is calling.
    pub agent_type: AgentType,
    /// The serialized input payload.
    pub input: serde_json::Value,
    /// Validates `input` before any call is made.
    pub input_validator: &'a dyn SchemaValidator,
    /// Validates the parsed LLM output before it is accepted.
    pub output_validator: &'a dyn SchemaValidator,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum attempts, including the first (§4.2 step 8: "retry up to
    /// maxRetries - 1 times").
    pub max_retries: u32,
    /// Correlation id for this pipeline run.
    pub run_id: RunId,
    /// Job that triggered this invocation.
    pub job_id: JobId,
    /// Queue the triggering job was drawn from.
    pub queue_name: String,
    /// Provider id this call is gated through (§4.7).
    pub provider_id: String,
}

/// Outcome of [`LlmRunner::run`] (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Whether the call ultimately succeeded.
    pub success: bool,
    /// Parsed, schema-validated output, present on success.
    pub output: Option<serde_json::Value>,
    /// Aggregated error message, present on failure.
    pub error: Option<String>,
    /// The `AgentRun` id recorded for this invocation.
    pub run_id: AgentRunId,
    /// Wall-clock duration across all attempts, in milliseconds.
    pub duration_ms: u64,
    /// Token count, when the provider reported one on the winning attempt.
    pub tokens_used: Option<u64>,
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Process-local counter mixed into generated `AgentRun` ids.
static AGENT_RUN_ID_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn generate_agent_run_id() -> AgentRunId {
    let now = OffsetDateTime::now_utc();
    let sequence = AGENT_RUN_ID_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    AgentRunId::new(format!("agentrun_{}_{sequence:x}", now.unix_timestamp()))
}

/// Ties together prompt rendering, the circuit breaker, the transport, JSON
/// extraction, and `AgentRun` recording (§4.2).
pub struct LlmRunner {
    transport: Arc<dyn LlmTransport>,
    agent_run_repo: Arc<dyn AgentRunRepository>,
    circuit_store: Arc<dyn CircuitBreakerStore>,
    prompts: PromptRegistry,
    sleeper: Arc<dyn Sleeper>,
}

impl LlmRunner {
    /// Builds a runner from its collaborators.
    #[must_use]
    pub fn new(
        transport: Arc<dyn LlmTransport>,
        agent_run_repo: Arc<dyn AgentRunRepository>,
        circuit_store: Arc<dyn CircuitBreakerStore>,
        prompts: PromptRegistry,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            agent_run_repo,
            circuit_store,
            prompts,
            sleeper,
        }
    }

    /// Executes §4.2's eight-step contract against `endpoint`/`model`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidInput`] when `request.input` fails
    /// `input_validator`, [`RunnerError::CircuitOpen`] when the provider's
    /// circuit breaker is `OPEN`, or propagates repository/store failures as
    /// [`RunnerError::RetriesExhausted`] wrapping their message.
    pub fn run(
        &self,
        request: &RunRequest<'_>,
        endpoint: &str,
        api_key: Option<&str>,
        model: &str,
    ) -> Result<RunOutcome, RunnerError> {
        let started_at = OffsetDateTime::now_utc();
        let run_id = generate_agent_run_id();

        // Step 1: validate input.
        if let Err(reason) = request.input_validator.validate(&request.input) {
            let run = AgentRun::start(
                run_id.clone(),
                request.agent_type.as_str(),
                request.input.clone(),
                request.run_id.clone(),
                request.job_id.clone(),
                request.queue_name.clone(),
            )
            .fail(format!("Invalid input: {reason}"), 0);
            let _ = self.agent_run_repo.put(run);
            return Err(RunnerError::InvalidInput(reason));
        }

        // Step 3: circuit breaker gate.
        let now = OffsetDateTime::now_utc();
        let breaker = load_or_init(self.circuit_store.as_ref(), &request.provider_id, now)
            .map_err(|err| RunnerError::RetriesExhausted(err.to_string()))?;
        if !breaker.can_call(now) {
            let run = AgentRun::start(
                run_id.clone(),
                request.agent_type.as_str(),
                request.input.clone(),
                request.run_id.clone(),
                request.job_id.clone(),
                request.queue_name.clone(),
            )
            .fail(format!("circuit open for provider {}", request.provider_id), 0);
            let _ = self.agent_run_repo.put(run);
            return Err(RunnerError::CircuitOpen(request.provider_id.clone()));
        }

        let template = self.prompts.get(request.agent_type);
        let system_message = template.map_or_else(
            || crate::prompt::STRICT_JSON_TRAILER.to_owned(),
            crate::prompt::PromptTemplate::system_message,
        );
        let user_message = render_user_message(&request.input);

        let running = AgentRun::start(
            run_id.clone(),
            request.agent_type.as_str(),
            request.input.clone(),
            request.run_id.clone(),
            request.job_id.clone(),
            request.queue_name.clone(),
        );

        let mut last_error = String::new();
        for attempt in 0..request.max_retries.max(1) {
            let chat_request = ChatRequest {
                endpoint: endpoint.to_owned(),
                api_key: api_key.map(ToOwned::to_owned),
                model: model.to_owned(),
                messages: vec![ChatMessage::system(system_message.clone()), ChatMessage::user(user_message.clone())],
                stream: false,
                options: ChatOptions {
                    temperature: request.temperature,
                    num_predict: 4_096,
                },
            };

            match self.attempt_once(&chat_request, request.output_validator) {
                Ok((output, tokens_used)) => {
                    let _ = self.circuit_store.save(&breaker.clone().record_success(OffsetDateTime::now_utc()), OffsetDateTime::now_utc());
                    let duration_ms = elapsed_ms(started_at);
                    let confidence = output.get("confidence").and_then(serde_json::Value::as_f64).and_then(|value| {
                        truth_core::Confidence::new(value).ok()
                    });
                    let completed = running.clone().complete(output.clone(), duration_ms, confidence);
                    let _ = self.agent_run_repo.put(completed);
                    return Ok(RunOutcome {
                        success: true,
                        output: Some(output),
                        error: None,
                        run_id,
                        duration_ms,
                        tokens_used,
                    });
                }
                Err((message, class)) => {
                    last_error = message.clone();
                    let failed_now = OffsetDateTime::now_utc();
                    let _ = self.circuit_store.save(&breaker.clone().record_failure(failed_now, message), failed_now);

                    let is_last_attempt = attempt + 1 >= request.max_retries.max(1);
                    if !is_last_attempt {
                        self.sleeper.sleep_ms(backoff_delay_ms(class, attempt));
                    }
                }
            }
        }

        let duration_ms = elapsed_ms(started_at);
        let failed = running.fail(last_error.clone(), duration_ms);
        let _ = self.agent_run_repo.put(failed);
        Ok(RunOutcome {
            success: false,
            output: None,
            error: Some(last_error),
            run_id,
            duration_ms,
            tokens_used: None,
        })
    }

    /// Steps 4–6: one transport call, JSON extraction, and output
    /// validation. Returns the classified failure reason on any error so
    /// the caller can drive backoff without re-deriving classification.
    fn attempt_once(
        &self,
        chat_request: &ChatRequest,
        output_validator: &dyn SchemaValidator,
    ) -> Result<(serde_json::Value, Option<u64>), (String, truth_queue::FailureClass)> {
        let response = self
            .transport
            .chat(chat_request)
            .map_err(|err: TransportError| (err.to_string(), err.failure_class()))?;

        let parsed = extract_json_object(&response.message).map_err(|err| (err.to_string(), truth_queue::FailureClass::General))?;

        output_validator
            .validate(&parsed)
            .map_err(|reason| (reason, truth_queue::FailureClass::General))?;

        Ok((parsed, response.eval_count))
    }
}

fn elapsed_ms(started_at: OffsetDateTime) -> u64 {
    let delta = OffsetDateTime::now_utc() - started_at;
    u64::try_from(delta.whole_milliseconds()).unwrap_or(0)
}
