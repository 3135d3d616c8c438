//! State module for tracking crawl progress
//!
//! This module provides the state that carries a crawl across runs.
//!
//! # Components
//!
//! - `SessionState`: Lifecycle of one crawl session (init, loading, running, terminal states)
//! - `CardIndex`: Identifier → last-known fingerprint, used for dedup and resume
//! - `FrontierItem` / `FrontierCursor`: Pending work and its persisted snapshot

mod card_index;
mod frontier_item;
mod session_state;

// Re-export main types
pub use card_index::{CardIndex, IndexEntry};
pub use frontier_item::{FrontierCursor, FrontierItem};
pub use session_state::SessionState;
