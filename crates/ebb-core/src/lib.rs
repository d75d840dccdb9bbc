//! # ebb-core
//! Foundation types, errors and collaborator traits for the Ebb campaign engine.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod wide;
