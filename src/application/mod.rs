// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers for one user-facing goal
// (training a run, translating with it). Workflow
// coordination only: no model math, no printing.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Translation with a finished run
pub mod translate_use_case;
