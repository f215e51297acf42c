//! Deferred platform mutations.

use std::fmt;

use crate::model::Member;

/// A platform mutation waiting for the dispatcher.
///
/// New mutation kinds become new variants here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Change a member's display name.
    Rename {
        /// Member snapshot the decision was made against
        target: Member,
        /// Name to apply
        new_name: String,
    },
}

impl Command {
    pub fn rename(target: Member, new_name: impl Into<String>) -> Self {
        Command::Rename {
            target,
            new_name: new_name.into(),
        }
    }

    /// The member this command mutates.
    pub fn target(&self) -> &Member {
        match self {
            Command::Rename { target, .. } => target,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Rename { target, new_name } => {
                write!(f, "rename {} to '{}'", target, new_name)
            }
        }
    }
}
