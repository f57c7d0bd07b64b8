//! Role and privilege configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named role and the privileges it declares directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    pub privileges: BTreeSet<String>,
}

impl RoleDefinition {
    pub fn new(name: &str, privileges: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.to_string(),
            privileges: privileges.into_iter().map(Into::into).collect(),
        }
    }
}

/// One inheritance edge: the parent role inherits all privileges and
/// inherited roles of the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHierarchyEdge {
    pub parent: String,
    pub child: String,
}

impl RoleHierarchyEdge {
    pub fn new(parent: &str, child: &str) -> Self {
        Self {
            parent: parent.to_string(),
            child: child.to_string(),
        }
    }

    /// Parse the configuration form `"PARENT > CHILD"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.splitn(2, '>');
        let parent = parts.next()?.trim();
        let child = parts.next()?.trim();
        if parent.is_empty() || child.is_empty() {
            return None;
        }
        Some(Self::new(parent, child))
    }
}
