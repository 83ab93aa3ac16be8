/// Crawl session lifecycle definitions
///
/// A session moves `Ready → Running → {Completed, Aborted}` and never leaves
/// a terminal state.
use serde::Serialize;
use std::fmt;

/// Lifecycle state of one crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Seed enqueued at depth 0, nothing fetched yet
    Ready,

    /// The crawl loop is executing
    Running,

    /// Frontier exhausted or page limit reached
    Completed,

    /// Iteration cap hit or cancellation requested
    Aborted,
}

impl SessionState {
    /// Returns true once the session can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Checks whether moving to `next` follows the lifecycle
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Ready, Self::Running)
                | (Self::Ready, Self::Aborted)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Aborted)
        )
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    /// Parses a state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ready" => Some(Self::Ready),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No entries left to fetch
    FrontierExhausted,

    /// The page counter reached `max_pages`
    PageLimit,

    /// Loop iterations reached the hard cap without enough pages
    IterationCap,

    /// The caller raised the cancellation flag
    Cancelled,
}

impl StopReason {
    /// The terminal state a session lands in for this reason
    pub fn final_state(&self) -> SessionState {
        match self {
            Self::FrontierExhausted | Self::PageLimit => SessionState::Completed,
            Self::IterationCap | Self::Cancelled => SessionState::Aborted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier_exhausted",
            Self::PageLimit => "page_limit",
            Self::IterationCap => "iteration_cap",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
