// truth-capability/src/executor.rs
// ============================================================================
// Module: Capability Executor
// Description: The six ordered gates of §4.11, plus the sequential batch
//              executor.
// Purpose: Let one code path enforce "authenticated, registered,
//          company-scoped, capability-ready, action-enabled, handler
//          succeeded" in that order, every time, rather than trusting each
//          caller to re-derive the gate sequence.
// Dependencies: serde_json, truth-core
// ============================================================================

//! ## Overview
//! [`CapabilityExecutor::execute`] runs gates 1–6 against one
//! [`ActionRequest`], short-circuiting on the first failure with the
//! [`ActionResult`] the failed gate names. [`CapabilityExecutor::execute_batch`]
//! performs the session check once, then runs `execute` once per entity id
//! strictly in order, honoring `continue_on_error`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use truth_core::ActionId;
use truth_core::CapabilityId;
use truth_core::ErrorCode;

use crate::capability::CapabilityState;
use crate::capability::CapabilityStateResolver;
use crate::company::CompanyContextResolver;
use crate::handler::ActionContext;
use crate::handler::HandlerRegistry;
use crate::session::SessionContext;

// ============================================================================
// SECTION: Request
// ============================================================================

/// One action dispatch request (§4.11: `execute({capabilityId, actionId,
/// entityId?, entityType?, params?})`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// The capability to act under.
    pub capability_id: CapabilityId,
    /// The action within that capability.
    pub action_id: ActionId,
    /// The target entity id, if the action names one.
    pub entity_id: Option<String>,
    /// The target entity type, if the action names one.
    pub entity_type: Option<String>,
    /// Caller-supplied parameters, merged with `entity_id` into
    /// `handlerParams` (§4.11 gate 6).
    pub params: Option<serde_json::Value>,
}

// ============================================================================
// SECTION: Result
// ============================================================================

/// The outcome of one [`CapabilityExecutor::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Whether the handler ran and returned successfully.
    pub success: bool,
    /// The handler's result payload, present only on success.
    pub data: Option<serde_json::Value>,
    /// A human-readable failure message, present only on failure.
    pub error: Option<String>,
    /// The stable [`ErrorCode`] string, present only on failure.
    pub code: Option<String>,
    /// Structured failure details (e.g. `{blockerType, resolution}`),
    /// present only for some failure codes.
    pub details: Option<serde_json::Value>,
}

impl ActionResult {
    /// A successful result carrying `data`.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self { success: true, data: Some(data), error: None, code: None, details: None }
    }

    /// A failed result with no structured details.
    #[must_use]
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()), code: Some(code.as_str().to_owned()), details: None }
    }

    /// A failed result with structured details attached.
    #[must_use]
    pub fn failure_with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code.as_str().to_owned()),
            details: Some(details),
        }
    }
}

// ============================================================================
// SECTION: Batch Result
// ============================================================================

/// One entity's outcome within a [`CapabilityExecutor::execute_batch`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    /// The entity id this result is for.
    pub entity_id: String,
    /// Whether the handler ran and returned successfully for this entity.
    pub success: bool,
    /// The handler's result payload, present only on success.
    pub data: Option<serde_json::Value>,
    /// A human-readable failure message, present only on failure.
    pub error: Option<String>,
    /// The stable [`ErrorCode`] string, present only on failure.
    pub code: Option<String>,
}

/// Aggregate outcome of a batch action run (§4.11 batch executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Total entity ids attempted.
    pub total: usize,
    /// Count of entities whose action succeeded.
    pub succeeded: usize,
    /// Count of entities whose action failed.
    pub failed: usize,
    /// Per-entity results, in the supplied entity order.
    pub results: Vec<BatchItemResult>,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Validates and dispatches business actions through the capability gates
/// (§4.11, C11).
pub struct CapabilityExecutor {
    handlers: Arc<HandlerRegistry>,
    companies: Arc<dyn CompanyContextResolver>,
    capabilities: Arc<dyn CapabilityStateResolver>,
}

impl CapabilityExecutor {
    /// Builds an executor from its collaborators.
    #[must_use]
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        companies: Arc<dyn CompanyContextResolver>,
        capabilities: Arc<dyn CapabilityStateResolver>,
    ) -> Self {
        Self { handlers, companies, capabilities }
    }

    /// Runs the six ordered gates against `request`, returning the first
    /// gate's failure or the handler's outcome.
    pub fn execute(&self, session: &SessionContext, request: &ActionRequest) -> ActionResult {
        // Gate 1: session present.
        let Some(user_id) = session.user_id() else {
            return ActionResult::failure(ErrorCode::Unauthorized, "Authentication required");
        };

        // Gate 2: handler registered.
        let Some(handler) = self.handlers.get(&request.capability_id, &request.action_id) else {
            return ActionResult::failure(ErrorCode::NotFound, "No handler registered for this action");
        };

        // Gate 3: company context.
        let Some(membership) = self.companies.resolve_default_company(user_id) else {
            return ActionResult::failure(ErrorCode::Unauthorized, "No company context available");
        };

        // Gate 4: capability state.
        let resolved = self.capabilities.resolve(&request.capability_id, request.entity_id.as_deref(), request.entity_type.as_deref());
        match &resolved.state {
            CapabilityState::Blocked { blockers } => {
                let Some(first) = blockers.first() else {
                    return ActionResult::failure(ErrorCode::CapabilityBlocked, "Capability is blocked");
                };
                return ActionResult::failure_with_details(
                    ErrorCode::CapabilityBlocked,
                    first.message.clone(),
                    serde_json::json!({"blockerType": first.blocker_type, "resolution": first.resolution}),
                );
            }
            CapabilityState::Unauthorized => {
                return ActionResult::failure(ErrorCode::Unauthorized, "Not authorized to perform this action");
            }
            CapabilityState::MissingInputs => {
                return ActionResult::failure(ErrorCode::ValidationError, "Required inputs are missing");
            }
            CapabilityState::Ready => {}
        }

        // Gate 5: action enabled.
        let action = resolved.actions.get(&request.action_id);
        match action {
            None => return ActionResult::failure(ErrorCode::CapabilityBlocked, "Action is not available"),
            Some(descriptor) if !descriptor.enabled => {
                let reason = descriptor.disabled_reason.clone().unwrap_or_else(|| "Action is not available".to_owned());
                return ActionResult::failure(ErrorCode::CapabilityBlocked, reason);
            }
            Some(_) => {}
        }

        // Gate 6: build context and dispatch.
        let context = ActionContext {
            user_id: user_id.clone(),
            company_id: membership.company_id,
            entity_id: request.entity_id.clone(),
            entity_type: request.entity_type.clone(),
            permissions: membership.permissions,
        };
        let handler_params = build_handler_params(request.entity_id.as_deref(), request.params.as_ref());
        match handler.invoke(&context, handler_params) {
            Ok(data) => ActionResult::ok(data),
            Err(message) => {
                tracing::warn!(capability_id = %request.capability_id, action_id = %request.action_id, "capability handler failed");
                ActionResult::failure(ErrorCode::InternalError, message)
            }
        }
    }

    /// Runs `execute` once per entry in `entity_ids`, strictly in order.
    /// The session check (gate 1) is performed once, upfront, matching
    /// §4.11's "session check is performed once, upfront": a missing
    /// session short-circuits the whole batch as a single failed result.
    pub fn execute_batch(
        &self,
        session: &SessionContext,
        capability_id: &CapabilityId,
        action_id: &ActionId,
        entity_ids: &[String],
        params: Option<serde_json::Value>,
        continue_on_error: bool,
    ) -> BatchResult {
        if session.user_id().is_none() {
            let result = ActionResult::failure(ErrorCode::Unauthorized, "Authentication required");
            return BatchResult {
                total: entity_ids.len(),
                succeeded: 0,
                failed: entity_ids.len(),
                results: entity_ids
                    .iter()
                    .map(|entity_id| batch_item_from(entity_id.clone(), &result))
                    .collect(),
            };
        }

        let mut results = Vec::with_capacity(entity_ids.len());
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for entity_id in entity_ids {
            let request = ActionRequest {
                capability_id: capability_id.clone(),
                action_id: action_id.clone(),
                entity_id: Some(entity_id.clone()),
                entity_type: None,
                params: params.clone(),
            };
            let outcome = self.execute(session, &request);
            if outcome.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            let stop = !outcome.success && !continue_on_error;
            results.push(batch_item_from(entity_id.clone(), &outcome));
            if stop {
                break;
            }
        }

        BatchResult { total: entity_ids.len(), succeeded, failed, results }
    }
}

/// Merges `entity_id` into `params` as `{id: entity_id, ...params}`
/// (§4.11 gate 6); without an `entity_id`, `params` passes through as-is.
fn build_handler_params(entity_id: Option<&str>, params: Option<&serde_json::Value>) -> serde_json::Value {
    let Some(entity_id) = entity_id else {
        return params.cloned().unwrap_or(serde_json::Value::Null);
    };
    let mut object = serde_json::Map::new();
    object.insert("id".to_owned(), serde_json::Value::String(entity_id.to_owned()));
    if let Some(serde_json::Value::Object(fields)) = params {
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
    }
    serde_json::Value::Object(object)
}

/// Builds one [`BatchItemResult`] from an [`ActionResult`], dropping its
/// structured `details` (not part of the batch item shape).
fn batch_item_from(entity_id: String, outcome: &ActionResult) -> BatchItemResult {
    BatchItemResult {
        entity_id,
        success: outcome.success,
        data: outcome.data.clone(),
        error: outcome.error.clone(),
        code: outcome.code.clone(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_params_merge_entity_id_first() {
        let merged = build_handler_params(Some("rule-1"), Some(&serde_json::json!({"note": "x"})));
        assert_eq!(merged, serde_json::json!({"id": "rule-1", "note": "x"}));
    }

    #[test]
    fn handler_params_without_entity_id_pass_through() {
        let merged = build_handler_params(None, Some(&serde_json::json!({"note": "x"})));
        assert_eq!(merged, serde_json::json!({"note": "x"}));
    }

    #[test]
    fn action_result_failure_carries_error_code_string() {
        let result = ActionResult::failure(ErrorCode::Unauthorized, "Authentication required");
        assert_eq!(result.code.as_deref(), Some("UNAUTHORIZED"));
        assert!(!result.success);
    }
}
