/// Session state definitions for the crawl controller
///
/// A session moves from `Init` through `LoadingIndex` into `Running` and ends
/// in exactly one terminal state.
use std::fmt;

/// Represents the lifecycle state of one crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Active States =====
    /// Session has been constructed but nothing has been loaded
    Init,

    /// Store integrity is being checked and the index loaded
    LoadingIndex,

    /// Frontier is being drained
    Running,

    // ===== Terminal Success States =====
    /// Frontier was exhausted
    Done,

    /// The new-item budget for this run was spent
    BudgetReached,

    /// A stop signal arrived or the source kept throttling
    Stopped,

    // ===== Terminal Error States =====
    /// Index corruption or a persistence failure
    Fatal,
}

impl SessionState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Init | Self::LoadingIndex | Self::Running)
    }

    /// Returns true if the session ended without error
    ///
    /// The frontier cursor is persisted for `BudgetReached` and `Stopped`,
    /// and cleared for `Done`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done | Self::BudgetReached | Self::Stopped)
    }

    /// Returns true if the session left work for a later run
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::BudgetReached | Self::Stopped)
    }

    /// Checks whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Init, Self::LoadingIndex) => true,
            (Self::LoadingIndex, Self::Running) => true,
            (Self::Running, Self::Done | Self::BudgetReached | Self::Stopped) => true,
            (Self::Init | Self::LoadingIndex | Self::Running, Self::Fatal) => true,
            _ => false,
        }
    }

    /// Converts the session state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadingIndex => "loading_index",
            Self::Running => "running",
            Self::Done => "done",
            Self::BudgetReached => "budget_reached",
            Self::Stopped => "stopped",
            Self::Fatal => "fatal",
        }
    }

    /// Parses a session state from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "init" => Some(Self::Init),
            "loading_index" => Some(Self::LoadingIndex),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "budget_reached" => Some(Self::BudgetReached),
            "stopped" => Some(Self::Stopped),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Returns all possible session states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Init,
            Self::LoadingIndex,
            Self::Running,
            Self::Done,
            Self::BudgetReached,
            Self::Stopped,
            Self::Fatal,
        ]
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!SessionState::Init.is_terminal());
        assert!(!SessionState::LoadingIndex.is_terminal());
        assert!(!SessionState::Running.is_terminal());

        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::BudgetReached.is_terminal());
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Fatal.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(SessionState::Done.is_success());
        assert!(SessionState::BudgetReached.is_success());
        assert!(SessionState::Stopped.is_success());
        assert!(!SessionState::Fatal.is_success());
        assert!(!SessionState::Running.is_success());
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(SessionState::Init.can_transition_to(SessionState::LoadingIndex));
        assert!(SessionState::LoadingIndex.can_transition_to(SessionState::Running));
        assert!(SessionState::Running.can_transition_to(SessionState::Done));
        assert!(SessionState::Running.can_transition_to(SessionState::BudgetReached));
        assert!(SessionState::Running.can_transition_to(SessionState::Stopped));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!SessionState::Init.can_transition_to(SessionState::Running));
        assert!(!SessionState::LoadingIndex.can_transition_to(SessionState::Done));
        assert!(!SessionState::Done.can_transition_to(SessionState::Running));
        assert!(!SessionState::Fatal.can_transition_to(SessionState::Fatal));
        assert!(!SessionState::Stopped.can_transition_to(SessionState::Fatal));
    }

    #[test]
    fn test_fatal_reachable_from_active_states() {
        for state in [
            SessionState::Init,
            SessionState::LoadingIndex,
            SessionState::Running,
        ] {
            assert!(state.can_transition_to(SessionState::Fatal));
        }
    }

    #[test]
    fn test_db_string_roundtrip() {
        for state in SessionState::all_states() {
            let db_str = state.to_db_string();
            assert_eq!(SessionState::from_db_string(db_str), Some(state));
        }
        assert_eq!(SessionState::from_db_string("invalid"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SessionState::BudgetReached), "budget_reached");
    }
}
