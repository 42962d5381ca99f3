//! Type definitions for sarau storage.

mod groups;
mod ids;
mod members;
mod requests;
mod roles;

// Re-export all types from submodules
pub use groups::*;
pub use ids::*;
pub use members::*;
pub use requests::*;
pub use roles::*;
