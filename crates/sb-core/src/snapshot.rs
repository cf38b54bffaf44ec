use serde::{Deserialize, Serialize};

use crate::ownership::OwnershipMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    Uninitialized,
    Active,
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundTypeInfo {
    pub bound_name: Option<String>,
    pub type_name: String,
    pub size: usize,
    pub align: usize,
    pub base_type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub slot: usize,
    pub mode: OwnershipMode,
    pub type_name: String,
    pub reachable: bool,
}

/// Diagnostic view of one environment incarnation at a quiescent point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub incarnation: u64,
    pub state: LifecycleState,
    pub bound_types: Vec<BoundTypeInfo>,
    pub slots: Vec<SlotInfo>,
    pub roots: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_camel_case_fields() {
        let snapshot = EnvironmentSnapshot {
            incarnation: 3,
            state: LifecycleState::Active,
            bound_types: vec![BoundTypeInfo {
                bound_name: Some("CrashClass".to_string()),
                type_name: "tests::CrashClass".to_string(),
                size: 4,
                align: 4,
                base_type_name: None,
            }],
            slots: vec![SlotInfo {
                slot: 0,
                mode: OwnershipMode::Copied,
                type_name: "tests::CrashClass".to_string(),
                reachable: true,
            }],
            roots: vec!["t".to_string()],
        };

        let json = serde_json::to_string(&snapshot).expect("snapshot should serialize");
        assert!(json.contains("\"boundTypes\""));
        assert!(json.contains("\"tornDown\"") || json.contains("\"active\""));
        assert!(json.contains("\"copied\""));

        let parsed: EnvironmentSnapshot =
            serde_json::from_str(&json).expect("snapshot should deserialize");
        assert_eq!(parsed, snapshot);
    }
}
