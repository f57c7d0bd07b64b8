//! Role hierarchy compilation and privilege resolution.
//!
//! The role→privilege map and inheritance edges compile once into a table of
//! effective privilege sets (one per role, over its transitive closure).
//! Resolution is a pure union over cached sets, safe for concurrent reads.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{RoleDefinition, RoleHierarchyEdge};
use crate::services::error::CoreError;

/// Compiled, immutable expansion table.
#[derive(Debug)]
pub struct RoleHierarchy {
    effective: HashMap<String, HashSet<String>>,
}

impl RoleHierarchy {
    /// Compile role definitions and inheritance edges.
    ///
    /// Fails closed: a duplicate role name or a cycle in the edge set rejects
    /// the whole configuration. Edge endpoints without a privilege mapping
    /// compile as roles with no declared privileges.
    pub fn compile(
        roles: &[RoleDefinition],
        edges: &[RoleHierarchyEdge],
    ) -> Result<Self, CoreError> {
        let mut declared: HashMap<&str, &BTreeSet<String>> = HashMap::new();
        for role in roles {
            if declared.insert(role.name.as_str(), &role.privileges).is_some() {
                return Err(CoreError::DuplicateRoleDefinition(role.name.clone()));
            }
        }

        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut nodes: BTreeSet<&str> = declared.keys().copied().collect();
        for edge in edges {
            nodes.insert(edge.parent.as_str());
            nodes.insert(edge.child.as_str());
            children
                .entry(edge.parent.as_str())
                .or_default()
                .push(edge.child.as_str());
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for node in nodes.iter().copied() {
            visit(node, &children, &mut marks)?;
        }

        let mut effective = HashMap::with_capacity(nodes.len());
        for node in nodes.iter().copied() {
            let mut privileges: HashSet<String> = HashSet::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut stack = vec![node];
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                if let Some(declared_privileges) = declared.get(current) {
                    privileges.extend(declared_privileges.iter().cloned());
                }
                if let Some(inherited) = children.get(current) {
                    stack.extend(inherited.iter().copied());
                }
            }
            effective.insert(node.to_string(), privileges);
        }

        tracing::debug!(roles = effective.len(), "Role hierarchy compiled");
        Ok(Self { effective })
    }

    /// Expand granted role names into the full effective privilege set.
    ///
    /// Unknown role names are ignored so stale grants degrade safely instead
    /// of blocking authorization.
    pub fn resolve<'a>(&self, granted: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
        let mut privileges = HashSet::new();
        for role in granted {
            if let Some(cached) = self.effective.get(role) {
                privileges.extend(cached.iter().cloned());
            }
        }
        privileges
    }

    pub fn contains_role(&self, name: &str) -> bool {
        self.effective.contains_key(name)
    }

    pub fn role_count(&self) -> usize {
        self.effective.len()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Visited,
}

fn visit<'a>(
    node: &'a str,
    children: &HashMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<(), CoreError> {
    match marks.get(node) {
        Some(Mark::Visiting) => return Err(CoreError::CyclicHierarchyConfig(node.to_string())),
        Some(Mark::Visited) => return Ok(()),
        None => {}
    }
    marks.insert(node, Mark::Visiting);
    for child in children.get(node).into_iter().flatten().copied() {
        visit(child, children, marks)?;
    }
    marks.insert(node, Mark::Visited);
    Ok(())
}
