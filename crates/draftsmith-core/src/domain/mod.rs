//! Domain models for draftsmith.
//!
//! Canonical definitions for the core entities:
//! - `IssueContext`: Immutable input of one invocation
//! - `StructuredChangeProposal`: The ten-field output contract
//! - `DraftError`: Input and proposal loading errors

pub mod error;
pub mod issue;
pub mod proposal;

// Re-export main types and errors
pub use error::{DraftError, Result};
pub use issue::IssueContext;
pub use proposal::StructuredChangeProposal;
