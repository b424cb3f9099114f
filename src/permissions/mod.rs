/// Field action codes, table actions and preset action strings.
pub mod actions;
/// Per-field action codes and presets, and their role-by-role resolution.
pub mod field;
/// Role inheritance tree flattening and overlay roles.
pub mod roles;
/// Per-table filters and their first-match resolution.
pub mod table;

mod resolver;
