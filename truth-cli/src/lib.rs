// truth-cli/src/lib.rs
// ============================================================================
// Module: Truth CLI Library
// Description: Shared helpers for the Truth Pipeline command-line interface.
// Purpose: Provide reusable components (i18n, runtime wiring) for the CLI
//          binary.
// Dependencies: truth-config, truth-core, truth-llm, truth-pipeline,
//              truth-queue, truth-store-sqlite, truth-watchdog
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities: the internationalized
//! message catalog ([`i18n`]) and the runtime collaborator wiring
//! ([`runtime`]). The binary entry point (`src/main.rs`) imports both to
//! keep argument parsing and dispatch separate from object construction.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;

/// Shared collaborator wiring (store, LLM runner, queue, notifier).
pub mod runtime;
