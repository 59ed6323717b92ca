// truth-capability/src/lib.rs
// ============================================================================
// Module: Truth Capability Library
// Description: Public API surface for the Capability Action Executor (C11).
// Purpose: Expose the session/company/capability seams, the handler
//          registry, and the executor that sequences them.
// Dependencies: crate::{capability, company, executor, handler, session}
// ============================================================================

//! ## Overview
//! `truth-capability` validates and dispatches business actions through a
//! fixed gate order (§4.11): session presence, handler registration,
//! company context, capability state, action enablement, then dispatch.
//! None of the five seams — [`session::SessionContext`],
//! [`company::CompanyContextResolver`],
//! [`capability::CapabilityStateResolver`], [`handler::HandlerRegistry`],
//! [`handler::ActionHandler`] — are implemented here beyond a static
//! reference resolver; the host application supplies the real ones.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capability;
pub mod company;
pub mod executor;
pub mod handler;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capability::ActionDescriptor;
pub use capability::Blocker;
pub use capability::CapabilityState;
pub use capability::CapabilityStateResolver;
pub use capability::ResolvedCapability;
pub use company::CompanyContextResolver;
pub use company::CompanyMembership;
pub use company::StaticCompanyContextResolver;
pub use executor::ActionRequest;
pub use executor::ActionResult;
pub use executor::BatchItemResult;
pub use executor::BatchResult;
pub use executor::CapabilityExecutor;
pub use handler::ActionContext;
pub use handler::ActionHandler;
pub use handler::HandlerRegistry;
pub use session::SessionContext;
pub use session::SessionUser;
