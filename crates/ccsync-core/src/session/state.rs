//! Session lifecycle states

/// What a session is currently doing.
///
/// ```text
/// Uninitialized -> Editing <-> { Pulling, Pushing }
/// any -> Error -> Editing (through initialize)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    /// File events mutate tracked state
    Editing,
    /// Remote code is being written into the project
    Pulling,
    /// A push is in flight
    Pushing,
    Error,
}

impl SessionState {
    /// Whether filesystem events may mutate tracked state.
    pub fn accepts_edits(&self) -> bool {
        matches!(self, Self::Editing)
    }

    /// Whether `next` is part of the normal lifecycle from `self`.
    pub fn is_expected_transition(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (_, Error)
                | (Uninitialized, Editing)
                | (Error, Editing)
                | (Editing, Pulling)
                | (Editing, Pushing)
                | (Pulling, Editing)
                | (Pushing, Editing)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Editing => "editing",
            Self::Pulling => "pulling",
            Self::Pushing => "pushing",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
