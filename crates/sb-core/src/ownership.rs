use serde::{Deserialize, Serialize};

/// How the script side holds a host value. Decided once when the value is
/// offered at the boundary and immutable for the handle's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipMode {
    Owned,
    Copied,
    BorrowedPointer,
    BorrowedReference,
    Shared,
}

impl OwnershipMode {
    /// True when the script collector is responsible for destruction.
    pub fn is_collector_owned(self) -> bool {
        matches!(self, Self::Owned | Self::Copied)
    }

    pub fn is_borrowed(self) -> bool {
        matches!(self, Self::BorrowedPointer | Self::BorrowedReference)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::Copied => "copied",
            Self::BorrowedPointer => "borrowedPointer",
            Self::BorrowedReference => "borrowedReference",
            Self::Shared => "shared",
        }
    }
}
