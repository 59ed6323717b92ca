// truth-llm/src/env.rs
// ============================================================================
// Module: Provider Endpoint Resolution
// Description: Resolves the active provider's base URL/model/key from
//              environment overrides, per §6's precedence rules.
// Purpose: Keep the OLLAMA_EXTRACT_* / OLLAMA_* / hardcoded-default cascade
//          (and the independent OLLAMA_EMBED_* cascade) in one place,
//          testable without touching real process environment.
// Dependencies: none beyond std
// ============================================================================

//! ## Overview
//! §6: `OLLAMA_EXTRACT_*` falls back to `OLLAMA_*`, then to a hardcoded
//! default (`https://ollama.com` + `llama3.1`). `OLLAMA_EMBED_*` is
//! independent and never consults `OLLAMA_EXTRACT_*`/`OLLAMA_*` — it falls
//! straight to its own hardcoded default (`http://localhost:11434` +
//! `nomic-embed-text`). Callers supply a `lookup` closure rather than reading
//! `std::env` directly, so tests can exercise the precedence without process
//! environment side effects.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hardcoded fallback endpoint for extraction-family calls.
pub const DEFAULT_EXTRACT_ENDPOINT: &str = "https://ollama.com";
/// Hardcoded fallback model for extraction-family calls.
pub const DEFAULT_EXTRACT_MODEL: &str = "llama3.1";
/// Hardcoded fallback endpoint for embedding calls.
pub const DEFAULT_EMBED_ENDPOINT: &str = "http://localhost:11434";
/// Hardcoded fallback model for embedding calls.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

// ============================================================================
// SECTION: Endpoint Config
// ============================================================================

/// A resolved base URL, model, and optional bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Base endpoint, e.g. `https://ollama.com`.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Bearer token, when configured.
    pub api_key: Option<String>,
}

/// Looks up an environment-style variable by name.
pub trait EnvLookup {
    /// Returns the value of `key`, or `None` if unset.
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// [`EnvLookup`] backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves extraction/composition/review/arbitration endpoint config:
/// `OLLAMA_EXTRACT_*` → `OLLAMA_*` → hardcoded default.
#[must_use]
pub fn resolve_extraction_endpoint(env: &dyn EnvLookup) -> EndpointConfig {
    let endpoint = env
        .get("OLLAMA_EXTRACT_ENDPOINT")
        .or_else(|| env.get("OLLAMA_ENDPOINT"))
        .unwrap_or_else(|| DEFAULT_EXTRACT_ENDPOINT.to_owned());
    let model = env
        .get("OLLAMA_EXTRACT_MODEL")
        .or_else(|| env.get("OLLAMA_MODEL"))
        .unwrap_or_else(|| DEFAULT_EXTRACT_MODEL.to_owned());
    let api_key = env.get("OLLAMA_EXTRACT_API_KEY").or_else(|| env.get("OLLAMA_API_KEY"));
    EndpointConfig { endpoint, model, api_key }
}

/// Resolves embedding endpoint config: `OLLAMA_EMBED_*` only, falling
/// straight to its own hardcoded default. Never reads `OLLAMA_EXTRACT_*` or
/// generic `OLLAMA_*` (§6: "Extraction env must not leak into embeddings").
#[must_use]
pub fn resolve_embedding_endpoint(env: &dyn EnvLookup) -> EndpointConfig {
    let endpoint = env.get("OLLAMA_EMBED_ENDPOINT").unwrap_or_else(|| DEFAULT_EMBED_ENDPOINT.to_owned());
    let model = env.get("OLLAMA_EMBED_MODEL").unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_owned());
    let api_key = env.get("OLLAMA_EMBED_API_KEY");
    EndpointConfig { endpoint, model, api_key }
}

/// Names the active provider (§6: `AI_PROVIDER`). Only `ollama` is
/// implemented; any other value (or an unset variable) resolves to `Ollama`
/// since it is the sole supported family (§1 Non-goals: "no LLM model
/// families beyond the Ollama-shaped transport").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// The only supported provider family.
    Ollama,
}

/// Resolves `AI_PROVIDER`.
#[must_use]
pub fn resolve_ai_provider(env: &dyn EnvLookup) -> AiProvider {
    match env.get("AI_PROVIDER").as_deref() {
        Some("ollama") | None => AiProvider::Ollama,
        Some(_other) => AiProvider::Ollama,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::resolve_embedding_endpoint;
    use super::resolve_extraction_endpoint;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn extraction_falls_back_through_the_full_cascade() {
        let env = env_from(&[]);
        let resolved = resolve_extraction_endpoint(&env);
        assert_eq!(resolved.endpoint, super::DEFAULT_EXTRACT_ENDPOINT);
        assert_eq!(resolved.model, super::DEFAULT_EXTRACT_MODEL);
    }

    #[test]
    fn extraction_specific_override_wins_over_generic() {
        let env = env_from(&[
            ("OLLAMA_ENDPOINT", "http://generic"),
            ("OLLAMA_EXTRACT_ENDPOINT", "http://specific"),
        ]);
        let resolved = resolve_extraction_endpoint(&env);
        assert_eq!(resolved.endpoint, "http://specific");
    }

    #[test]
    fn generic_override_applies_when_extraction_specific_is_unset() {
        let env = env_from(&[("OLLAMA_MODEL", "mixtral")]);
        let resolved = resolve_extraction_endpoint(&env);
        assert_eq!(resolved.model, "mixtral");
    }

    #[test]
    fn embedding_never_sees_extraction_or_generic_overrides() {
        let env = env_from(&[
            ("OLLAMA_ENDPOINT", "http://generic"),
            ("OLLAMA_EXTRACT_ENDPOINT", "http://specific"),
            ("OLLAMA_MODEL", "mixtral"),
        ]);
        let resolved = resolve_embedding_endpoint(&env);
        assert_eq!(resolved.endpoint, super::DEFAULT_EMBED_ENDPOINT);
        assert_eq!(resolved.model, super::DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn embedding_honors_its_own_override() {
        let env = env_from(&[("OLLAMA_EMBED_MODEL", "nomic-embed-text-v2")]);
        let resolved = resolve_embedding_endpoint(&env);
        assert_eq!(resolved.model, "nomic-embed-text-v2");
    }
}
