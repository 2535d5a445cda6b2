//! Canonical operation names a source may implement.

use std::fmt::{Display, Formatter};

/// One of the seven repository operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Get,
    GetAll,
    Query,
    Add,
    Remove,
    Fetch,
    Update,
}

impl Operation {
    /// Every operation in canonical binding order.
    pub const ALL: [Operation; 7] = [
        Self::Get,
        Self::GetAll,
        Self::Query,
        Self::Add,
        Self::Remove,
        Self::Fetch,
        Self::Update,
    ];

    /// Stable string id used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::GetAll => "getAll",
            Self::Query => "query",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Fetch => "fetch",
            Self::Update => "update",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
