mod support;

use std::collections::HashSet;

use schema2hasura::permissions::actions::ActionCode;
use schema2hasura::permissions::field::FieldPermissions;
use schema2hasura::permissions::roles::{OverlayRoles, PermissionTree, RoleHierarchy};
use schema2hasura::permissions::table::TablePermissions;
use schema2hasura::ConfigError;
use serde_json::json;

use support::{load_fixture_document, load_fixture_project};

fn code(code: &str) -> ActionCode {
    code.parse().expect("action code should parse")
}

fn tree(value: serde_json::Value) -> PermissionTree {
    serde_json::from_value(value).expect("permission tree should parse")
}

fn ancestors(tree: &PermissionTree, role: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut stack = vec![role.to_string()];
    while let Some(current) = stack.pop() {
        for parent in &tree[&current] {
            if out.insert(parent.clone()) {
                stack.push(parent.clone());
            }
        }
    }
    out
}

#[test]
fn testapp_resolution_lists_follow_breadth_first_order() {
    let project = load_fixture_project("testapp");
    let roles = &project.roles;

    assert_eq!(roles.resolve("public").unwrap(), ["public"]);
    assert_eq!(roles.resolve("auth").unwrap(), ["auth", "public"]);
    assert_eq!(
        roles.resolve("project_management").unwrap(),
        ["project_management", "project_edit", "project", "auth", "public"]
    );
    assert_eq!(
        roles.resolve("organization_management").unwrap(),
        ["organization_management", "organization", "project", "auth", "public"]
    );
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
fn every_role_lists_itself_first_and_each_ancestor_once() {
    let document = load_fixture_document("testapp");
    let project = load_fixture_project("testapp");

    for (role, list) in project.roles.resolution_lists() {
        assert_eq!(list[0], role, "{role} should come first in its own list");

        let unique: HashSet<&String> = list.iter().collect();
        assert_eq!(unique.len(), list.len(), "{role} list has duplicates: {list:?}");

        let rest: HashSet<String> = list[1..].iter().cloned().collect();
        assert_eq!(rest, ancestors(&document.permission_tree, role), "ancestors of {role}");
    }
}

#[test]
fn public_fallback_applies_to_every_hierarchy_role() {
    let project = load_fixture_project("testapp");
    let field = FieldPermissions::public(code("-s-"));

    for role in project.roles.roles() {
        let access = project.roles.resolve_field(&field, None, role).unwrap();
        assert_eq!(access.code, ActionCode::SELECT_ONLY, "role {role}");
    }
}

#[test]
fn more_specific_entries_never_revoke_inherited_grants() {
    let project = load_fixture_project("testapp");
    let inherited = FieldPermissions::new().with_role("auth", code("is-"));
    let narrowed = inherited.clone().with_role("project_edit", code("--u"));

    let before = project
        .roles
        .resolve_field(&inherited, None, "project_management")
        .unwrap();
    let after = project
        .roles
        .resolve_field(&narrowed, None, "project_management")
        .unwrap();

    assert_eq!(before.code, code("is-"));
    assert_eq!(after.code, code("isu"));
}

#[test]
fn public_entry_also_merges_as_an_ancestor() {
    let project = load_fixture_project("testapp");
    let field = FieldPermissions::public(code("-s-")).with_role("project", code("i--"));

    let developer = project.roles.resolve_field(&field, None, "developer").unwrap();
    let auth = project.roles.resolve_field(&field, None, "auth").unwrap();

    assert_eq!(developer.code, code("is-"));
    assert_eq!(auth.code, ActionCode::SELECT_ONLY);
}

#[test]
fn table_filters_are_inherited_unchanged() {
    let roles = RoleHierarchy::new(
        &tree(json!({"a": ["b"], "b": []})),
        OverlayRoles::default(),
    )
    .unwrap();
    let table: TablePermissions = serde_json::from_value(json!({"b": {"select": {}}})).unwrap();

    let resolved = roles.resolve_table(&table, "a").unwrap();
    assert_eq!(resolved.select, Some(json!({})));
    assert_eq!(resolved.insert, None);
}

#[test]
fn malformed_trees_are_rejected() {
    let dangling = RoleHierarchy::new(&tree(json!({"auth": ["public"]})), OverlayRoles::default());
    assert_eq!(
        dangling.unwrap_err(),
        ConfigError::UnknownParentRole {
            role: "auth".to_string(),
            parent: "public".to_string(),
        }
    );

    let self_loop = RoleHierarchy::new(&tree(json!({"a": ["a"]})), OverlayRoles::default());
    assert!(matches!(self_loop, Err(ConfigError::CircularReference { .. })));

    let indirect = RoleHierarchy::new(
        &tree(json!({"root": ["a"], "a": ["b"], "b": ["a"]})),
        OverlayRoles::default(),
    );
    assert!(matches!(indirect, Err(ConfigError::CircularReference { .. })));

    let overlay = RoleHierarchy::new(
        &tree(json!({"public": [], "module_auth": ["public"]})),
        OverlayRoles::default(),
    );
    assert!(matches!(overlay, Err(ConfigError::OverlayRoleInHierarchy { .. })));
}

#[test]
fn overlay_roles_resolve_standalone() {
    let project = load_fixture_project("testapp");
    let field = FieldPermissions::public(code("isu")).with_role("module_auth_2", code("-su"));

    let pre = project.roles.resolve_field(&field, None, "module_auth").unwrap();
    let post = project.roles.resolve_field(&field, None, "module_auth_2").unwrap();

    assert_eq!(pre.code, ActionCode::NONE);
    assert_eq!(post.code, code("-su"));
    assert!(matches!(
        project.roles.resolve("module_auth"),
        Err(ConfigError::UnknownRole { .. })
    ));
}
