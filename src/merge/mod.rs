//! Three-way structural merge of independent configuration edits.

mod conflict;
mod merge_coordinator;
pub use conflict::*;
pub use merge_coordinator::*;
