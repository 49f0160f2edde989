//! Completion endpoint clients

pub mod genie;

// Re-export for convenience
pub use genie::{format_clinical_prompt, GenieClient};
