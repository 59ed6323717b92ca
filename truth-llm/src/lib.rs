// truth-llm/src/lib.rs
// ============================================================================
// Module: Truth LLM Library
// Description: Public API surface for the LLM runner (C3) and circuit
//              breakers (C9).
// Purpose: Expose the runner, transport trait, prompt registry, circuit
//          breaker state machine, and endpoint resolution helpers.
// Dependencies: crate::{circuit_breaker, env, error, parse, prompt, runner,
//              transport}
// ============================================================================

//! ## Overview
//! `truth-llm` wraps every LLM call the pipeline makes (Extractor, Composer,
//! Reviewer, Arbiter) behind one entry point, [`runner::LlmRunner::run`],
//! implementing §4.2's contract: input validation, prompt rendering,
//! circuit-breaker gating (§4.7), the HTTP round trip, JSON extraction
//! tolerant of code fences and `message.thinking`, output validation,
//! `AgentRun` recording, and classified retry/backoff.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod circuit_breaker;
pub mod env;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod runner;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use circuit_breaker::CircuitBreakerRecord;
pub use circuit_breaker::CircuitBreakerStore;
pub use circuit_breaker::CircuitBreakerStoreError;
pub use circuit_breaker::CircuitState;
pub use circuit_breaker::load_or_init;
pub use env::AiProvider;
pub use env::EndpointConfig;
pub use env::EnvLookup;
pub use env::ProcessEnv;
pub use env::resolve_ai_provider;
pub use env::resolve_embedding_endpoint;
pub use env::resolve_extraction_endpoint;
pub use error::HealthStatus;
pub use error::RunnerError;
pub use error::TransportError;
pub use parse::ParseError;
pub use parse::extract_json_object;
pub use prompt::AgentType;
pub use prompt::PromptRegistry;
pub use prompt::PromptTemplate;
pub use prompt::render_user_message;
pub use runner::AcceptAllValidator;
pub use runner::LlmRunner;
pub use runner::NoopSleeper;
pub use runner::RealSleeper;
pub use runner::RunOutcome;
pub use runner::RunRequest;
pub use runner::SchemaValidator;
pub use runner::Sleeper;
pub use transport::ChatMessage;
pub use transport::ChatOptions;
pub use transport::ChatRequest;
pub use transport::ChatResponse;
pub use transport::ChatResponseMessage;
pub use transport::HttpLlmTransport;
pub use transport::LlmTransport;
