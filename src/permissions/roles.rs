use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Role name → parent roles it inherits from, in declaration order.
pub type PermissionTree = IndexMap<String, Vec<String>>;

/// Names of the two transitional authentication roles.
///
/// They never take part in inheritance: an overlay role resolves to itself only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRoles {
    /// Unauthenticated lookup during login. Select grants only.
    #[serde(default = "default_pre_auth")]
    pub pre_auth: String,
    /// Short-lived role after authentication. Select/insert/update grants.
    #[serde(default = "default_post_auth")]
    pub post_auth: String,
}

fn default_pre_auth() -> String {
    "module_auth".to_string()
}

fn default_post_auth() -> String {
    "module_auth_2".to_string()
}

impl Default for OverlayRoles {
    fn default() -> Self {
        Self {
            pre_auth: default_pre_auth(),
            post_auth: default_post_auth(),
        }
    }
}

/// Which overlay a role name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Before authentication.
    PreAuth,
    /// After authentication.
    PostAuth,
}

/// A validated role hierarchy with every role's flattened resolution list.
#[derive(Debug, Clone)]
pub struct RoleHierarchy {
    resolution: IndexMap<String, Vec<String>>,
    overlays: OverlayRoles,
}

impl RoleHierarchy {
    /// Validate `tree` and flatten every role into its resolution list.
    ///
    /// Fails on dangling parent references, cycles, and overlay roles declared
    /// inside the tree.
    pub fn new(tree: &PermissionTree, overlays: OverlayRoles) -> Result<Self, ConfigError> {
        for role in [&overlays.pre_auth, &overlays.post_auth] {
            if tree.contains_key(role) {
                return Err(ConfigError::OverlayRoleInHierarchy { role: role.clone() });
            }
        }

        let mut resolution = IndexMap::with_capacity(tree.len());
        for root in tree.keys() {
            resolution.insert(root.clone(), flatten(tree, root)?);
        }

        Ok(Self {
            resolution,
            overlays,
        })
    }

    /// Resolution list of `role`: the role itself first, then its ancestors in
    /// breadth-first discovery order without duplicates.
    pub fn resolve(&self, role: &str) -> Result<&[String], ConfigError> {
        self.resolution
            .get(role)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::UnknownRole {
                role: role.to_string(),
            })
    }

    /// Hierarchy roles in declaration order (overlay roles excluded).
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.resolution.keys().map(String::as_str)
    }

    /// Every hierarchy role paired with its resolution list.
    pub fn resolution_lists(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.resolution
            .iter()
            .map(|(role, list)| (role.as_str(), list.as_slice()))
    }

    /// True when `role` is part of the inheritance tree.
    pub fn contains(&self, role: &str) -> bool {
        self.resolution.contains_key(role)
    }

    /// Configured overlay role names.
    pub fn overlays(&self) -> &OverlayRoles {
        &self.overlays
    }

    /// Classify `role` as an overlay, if it is one.
    pub fn overlay_kind(&self, role: &str) -> Option<OverlayKind> {
        if role == self.overlays.pre_auth {
            Some(OverlayKind::PreAuth)
        } else if role == self.overlays.post_auth {
            Some(OverlayKind::PostAuth)
        } else {
            None
        }
    }

    /// True for hierarchy roles and overlay roles alike.
    pub fn is_known(&self, role: &str) -> bool {
        self.contains(role) || self.overlay_kind(role).is_some()
    }
}

fn flatten(tree: &PermissionTree, root: &str) -> Result<Vec<String>, ConfigError> {
    let mut order = vec![root.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([root]);
    let mut queue: VecDeque<&str> = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        let parents = tree.get(current).map(Vec::as_slice).unwrap_or_default();
        for parent in parents {
            if !tree.contains_key(parent) {
                return Err(ConfigError::UnknownParentRole {
                    role: current.to_string(),
                    parent: parent.clone(),
                });
            }
            if parent == root {
                return Err(ConfigError::CircularReference {
                    role: root.to_string(),
                });
            }
            if seen.insert(parent.as_str()) {
                order.push(parent.clone());
                queue.push_back(parent.as_str());
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(entries: &[(&str, &[&str])]) -> PermissionTree {
        entries
            .iter()
            .map(|(role, parents)| {
                (
                    role.to_string(),
                    parents.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn flatten_orders_ancestors_breadth_first() {
        let tree = tree(&[
            ("public", &[]),
            ("auth", &["public"]),
            ("project", &["auth"]),
            ("project_edit", &["project"]),
            ("organization", &["project"]),
            ("project_management", &["project_edit"]),
            ("organization_projectmanager", &["project"]),
            ("developer", &["project_management", "organization_projectmanager"]),
        ]);
        let roles = RoleHierarchy::new(&tree, OverlayRoles::default()).unwrap();

        assert_eq!(roles.resolve("public").unwrap(), ["public"]);
        assert_eq!(
            roles.resolve("developer").unwrap(),
            [
                "developer",
                "project_management",
                "organization_projectmanager",
                "project_edit",
                "project",
                "auth",
                "public",
            ]
        );
    }

    #[test]
    fn diamond_ancestors_appear_once() {
        let tree = tree(&[
            ("base", &[]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("top", &["left", "right"]),
        ]);
        let roles = RoleHierarchy::new(&tree, OverlayRoles::default()).unwrap();
        assert_eq!(roles.resolve("top").unwrap(), ["top", "left", "right", "base"]);
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let tree = tree(&[("auth", &["public"])]);
        let err = RoleHierarchy::new(&tree, OverlayRoles::default()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownParentRole {
                role: "auth".to_string(),
                parent: "public".to_string(),
            }
        );
    }

    #[test]
    fn self_reference_and_longer_cycles_are_rejected() {
        let self_ref = tree(&[("auth", &["auth"])]);
        assert!(matches!(
            RoleHierarchy::new(&self_ref, OverlayRoles::default()),
            Err(ConfigError::CircularReference { .. })
        ));

        let cycle = tree(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert!(matches!(
            RoleHierarchy::new(&cycle, OverlayRoles::default()),
            Err(ConfigError::CircularReference { .. })
        ));
    }

    #[test]
    fn overlay_roles_cannot_join_the_tree() {
        let tree = tree(&[("public", &[]), ("module_auth", &["public"])]);
        assert_eq!(
            RoleHierarchy::new(&tree, OverlayRoles::default()).unwrap_err(),
            ConfigError::OverlayRoleInHierarchy {
                role: "module_auth".to_string()
            }
        );
    }

    #[test]
    fn unknown_role_lookup_is_an_error() {
        let roles = RoleHierarchy::new(&tree(&[("public", &[])]), OverlayRoles::default()).unwrap();
        assert!(roles.resolve("ghost").is_err());
        assert_eq!(roles.overlay_kind("module_auth_2"), Some(OverlayKind::PostAuth));
        assert!(roles.is_known("module_auth"));
        assert!(!roles.contains("module_auth"));
    }
}
