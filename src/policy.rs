// src/policy.rs
// Operation classification: read / write-requires-approval / forbidden

use crate::error::{KitError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Policy outcome for an operation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// Executes immediately against the Kit API.
    Read,
    /// Staged in the approval ledger; runs only after explicit confirmation.
    Write,
    /// Never executed.
    Forbidden,
}

/// Static table mapping operation identifiers to their class.
///
/// Loaded once at startup and immutable for the process lifetime. The file
/// shape matches permissions.json: three arrays of operation names.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyTable {
    #[serde(default)]
    read_operations: HashSet<String>,
    #[serde(default)]
    write_operations_require_approval: HashSet<String>,
    #[serde(default)]
    forbidden_operations: HashSet<String>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            read_operations: owned(&[
                "list_broadcasts",
                "get_broadcast",
                "list_subscribers",
                "list_tags",
            ]),
            write_operations_require_approval: owned(&[
                "create_broadcast",
                "add_subscriber",
                "create_tag",
                "tag_subscriber",
            ]),
            forbidden_operations: owned(&["delete_broadcast", "unsubscribe"]),
        }
    }
}

impl PolicyTable {
    /// Load a policy table from a JSON file. A malformed or unreadable file
    /// is a configuration failure and aborts startup.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            KitError::Config(format!("cannot read policy file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            KitError::Config(format!("malformed policy file {}: {e}", path.display()))
        })
    }

    /// Classify an operation identifier.
    ///
    /// Forbidden beats read; an identifier absent from both the forbidden
    /// and read sets classifies as a write and will require approval.
    pub fn classify(&self, operation: &str) -> OperationClass {
        if self.forbidden_operations.contains(operation) {
            OperationClass::Forbidden
        } else if self.read_operations.contains(operation) {
            OperationClass::Read
        } else {
            OperationClass::Write
        }
    }

    /// One-line description of the table, for startup logging.
    pub fn summary(&self) -> String {
        format!(
            "{} read, {} approval-required, {} forbidden",
            self.read_operations.len(),
            self.write_operations_require_approval.len(),
            self.forbidden_operations.len()
        )
    }
}
