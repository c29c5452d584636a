//! Incremental transcript reconciliation
//!
//! Turns the backend's stream of revisable fragments into a stable,
//! monotonically growing transcript.

mod reconcile;

pub use reconcile::TranscriptReconciler;
