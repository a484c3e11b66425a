use serde::{Deserialize, Serialize};

/// Broad failure classes surfaced at component boundaries.
///
/// Every operation error maps onto exactly one of these so transports can
/// pick a wire representation without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The addressed entity does not exist or is not visible to the caller.
    NotFound,
    /// The request itself is malformed or out of range.
    Validation,
    /// A downstream collaborator failed. The downstream status code is
    /// preserved where one was observed.
    Upstream,
    /// Storage faults and everything else.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }
}
