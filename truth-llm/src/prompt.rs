// truth-llm/src/prompt.rs
// ============================================================================
// Module: Prompt Templates
// Description: Data-driven prompt templates keyed by agent type (§4.2).
// Purpose: Keep prompts as typed data rather than free-form strings
//          scattered across call sites.
// Dependencies: std::collections::HashMap
// ============================================================================

//! ## Overview
//! Every LLM call anywhere in the pipeline names an [`AgentType`] and looks
//! up its [`PromptTemplate`] from a [`PromptRegistry`]. The registry is a
//! plain map so callers (tests, the pipeline crate) can substitute their own
//! templates without touching `truth-llm` internals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;

// ============================================================================
// SECTION: Agent Type
// ============================================================================

/// Which pipeline stage is invoking the LLM (§4.2–§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    /// C5 Extractor.
    Extractor,
    /// C6 Composer.
    Composer,
    /// C7 Reviewer.
    Reviewer,
    /// C7 Arbiter.
    Arbiter,
    /// C8 Releaser (changelog generation only; version/hash are derived).
    Releaser,
}

impl AgentType {
    /// Returns the `snake_case` string persisted on `AgentRun.agent_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extractor => "extractor",
            Self::Composer => "composer",
            Self::Reviewer => "reviewer",
            Self::Arbiter => "arbiter",
            Self::Releaser => "releaser",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Prompt Template
// ============================================================================

/// Fixed text appended to the system message and to the rendered user
/// message, demanding JSON-only output (§4.2 steps 2 and 4).
pub const STRICT_JSON_TRAILER: &str =
    "Respond with a single JSON object only. No prose, no explanation, no Markdown code fences.";

/// A system prompt bound to one [`AgentType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// The agent this template is for.
    pub agent_type: AgentType,
    /// Base system instructions, without the strict-JSON trailer.
    pub system_prompt: String,
}

impl PromptTemplate {
    /// Builds a template.
    #[must_use]
    pub fn new(agent_type: AgentType, system_prompt: impl Into<String>) -> Self {
        Self {
            agent_type,
            system_prompt: system_prompt.into(),
        }
    }

    /// Renders the full system message: base prompt plus the strict-JSON
    /// trailer (§4.2 step 4).
    #[must_use]
    pub fn system_message(&self) -> String {
        format!("{}\n\n{STRICT_JSON_TRAILER}", self.system_prompt)
    }
}

/// Renders `input` as the user message: indented JSON plus the strict-JSON
/// trailer (§4.2 step 2).
#[must_use]
pub fn render_user_message(input: &serde_json::Value) -> String {
    let rendered = serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
    format!("{rendered}\n\n{STRICT_JSON_TRAILER}")
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Maps [`AgentType`] to its [`PromptTemplate`].
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: HashMap<AgentType, PromptTemplate>,
}

impl PromptRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { templates: HashMap::new() }
    }

    /// Registers (or replaces) the template for `template.agent_type`.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.agent_type, template);
    }

    /// Looks up the template for `agent_type`.
    #[must_use]
    pub fn get(&self, agent_type: AgentType) -> Option<&PromptTemplate> {
        self.templates.get(&agent_type)
    }

    /// Builds the registry populated with the four pipeline stage prompts
    /// described in §4.3 (Extractor), §4.6 (Composer), and §4's sketch of
    /// the Reviewer/Arbiter contract.
    #[must_use]
    pub fn with_default_prompts() -> Self {
        let mut registry = Self::new();
        registry.register(PromptTemplate::new(
            AgentType::Extractor,
            "You extract structured regulatory facts from source text. For each fact, report its domain, \
             value type, extracted value, the exact verbatim quote it came from, optional surrounding \
             context, a confidence score in [0,1], and any article/law reference. Output \
             {\"extractions\": [...]} with one entry per fact found; an empty array is a valid result.",
        ));
        registry.register(PromptTemplate::new(
            AgentType::Composer,
            "You compose a single versioned rule from a set of extracted facts that share a domain. If the \
             facts are mutually consistent, output {\"draft_rule\": {...}} with concept_slug, title_hr, \
             title_en, risk_tier, applies_when, value, value_type, explanation_hr, explanation_en, \
             effective_from, confidence, and source_pointer_ids. If the facts conflict irreconcilably, \
             output {\"conflicts_detected\": {\"description\": ..., ...}} instead.",
        ));
        registry.register(PromptTemplate::new(
            AgentType::Reviewer,
            "You review a draft rule for internal consistency and evidentiary support, reporting any \
             concerns as free-text reasons alongside your own confidence assessment.",
        ));
        registry.register(PromptTemplate::new(
            AgentType::Arbiter,
            "You explain, in one or two sentences, why the higher-authority source should prevail in a \
             conflict between two candidate facts.",
        ));
        registry.register(PromptTemplate::new(
            AgentType::Releaser,
            "You write a short human-readable changelog entry summarizing the rules included in a release. \
             Output {\"changelog\": \"...\"}. Never suggest a version number or release type; those are \
             derived deterministically and any suggestion you make is ignored.",
        ));
        registry
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::AgentType;
    use super::PromptRegistry;
    use super::render_user_message;

    #[test]
    fn default_registry_covers_every_agent_type() {
        let registry = PromptRegistry::with_default_prompts();
        assert!(registry.get(AgentType::Extractor).is_some());
        assert!(registry.get(AgentType::Composer).is_some());
        assert!(registry.get(AgentType::Reviewer).is_some());
        assert!(registry.get(AgentType::Arbiter).is_some());
        assert!(registry.get(AgentType::Releaser).is_some());
    }

    #[test]
    fn system_message_carries_the_strict_json_trailer() {
        let registry = PromptRegistry::with_default_prompts();
        let template = registry.get(AgentType::Extractor).expect("registered");
        assert!(template.system_message().contains(super::STRICT_JSON_TRAILER));
    }

    #[test]
    fn user_message_renders_indented_json_with_trailer() {
        let rendered = render_user_message(&serde_json::json!({"evidence_id": "e1"}));
        assert!(rendered.contains("\"evidence_id\""));
        assert!(rendered.contains(super::STRICT_JSON_TRAILER));
    }
}
