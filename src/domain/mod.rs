// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs, errors and traits that describe the
// translation training problem. Nothing in here touches Burn,
// the filesystem or the tokenizers crate.
//
//   pair.rs    - text pairs, tokenized examples, tracked rows
//   errors.rs  - the data-pipeline error taxonomy
//   traits.rs  - the ports the pipeline and learner talk to
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Parallel text pairs and their tokenized form
pub mod pair;

// Typed errors for setup-time data failures
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;
