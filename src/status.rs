// src/status.rs

//! Job outcome recorded per node.

use std::fmt;

/// Outcome of a job, as recorded in the factory's status history.
///
/// `Unknown` is the pre-run default. For every node except `root` it means
/// "never decided"; the root node alone treats a still-`Unknown` status as
/// overall success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Unknown,
    Success,
    Failure,
    /// Not executed on purpose. Downstream nodes treat it like `Success`.
    ForceSkip,
}

impl Status {
    /// Stable numeric value used in log lines.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
            Status::ForceSkip => 2,
            Status::Unknown => -1,
        }
    }

    /// Whether a node with this status lets its dependents execute.
    pub fn lets_dependents_run(self) -> bool {
        matches!(self, Status::Success | Status::ForceSkip)
    }

    pub fn is_unknown(self) -> bool {
        self == Status::Unknown
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Unknown => "unknown",
            Status::Success => "success",
            Status::Failure => "failure",
            Status::ForceSkip => "force_skip",
        };
        f.write_str(s)
    }
}
