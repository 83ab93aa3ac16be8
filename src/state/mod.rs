//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SessionState`: lifecycle of a crawl session (ready, running, completed, aborted)
//! - `StopReason`: why the crawl loop terminated
//! - `TerrainMap`: observability map of visited URLs

mod session_state;
mod terrain;

pub use session_state::{SessionState, StopReason};
pub use terrain::{TerrainEntry, TerrainMap};
