//! Domain layer types and invariants.

pub mod error;
pub mod ids;
pub mod pets;
pub mod posts;
pub mod validation;
