use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Row-level action a table permission entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableAction {
    /// Read rows.
    Select,
    /// Create rows.
    Insert,
    /// Modify rows.
    Update,
    /// Remove rows.
    Delete,
}

impl TableAction {
    /// All actions, in manifest order.
    pub const ALL: [TableAction; 4] = [
        TableAction::Select,
        TableAction::Insert,
        TableAction::Update,
        TableAction::Delete,
    ];

    /// Lowercase name as used in registry documents.
    pub fn as_str(self) -> &'static str {
        match self {
            TableAction::Select => "select",
            TableAction::Insert => "insert",
            TableAction::Update => "update",
            TableAction::Delete => "delete",
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column-level grant encoded as a 3-character code over `{i, s, u, -}`.
///
/// Position 0 is insert (`i` or `-`), position 1 is select (`s` or `-`),
/// position 2 is update (`u` or `-`).
///
/// ```
/// use schema2hasura::permissions::actions::ActionCode;
///
/// let code: ActionCode = "-su".parse().unwrap();
/// assert!(!code.insert && code.select && code.update);
/// assert_eq!(code.to_string(), "-su");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActionCode {
    /// Column may be written on insert.
    pub insert: bool,
    /// Column may be read.
    pub select: bool,
    /// Column may be written on update.
    pub update: bool,
}

impl ActionCode {
    /// `---`: no access.
    pub const NONE: ActionCode = ActionCode {
        insert: false,
        select: false,
        update: false,
    };

    /// `-s-`: read-only.
    pub const SELECT_ONLY: ActionCode = ActionCode {
        insert: false,
        select: true,
        update: false,
    };

    /// Grants the given column-level action. Delete is row-granular and never granted here.
    pub fn grants(self, action: TableAction) -> bool {
        match action {
            TableAction::Select => self.select,
            TableAction::Insert => self.insert,
            TableAction::Update => self.update,
            TableAction::Delete => false,
        }
    }

    /// Bitwise OR of two codes.
    pub fn union(self, other: ActionCode) -> ActionCode {
        ActionCode {
            insert: self.insert || other.insert,
            select: self.select || other.select,
            update: self.update || other.update,
        }
    }
}

impl FromStr for ActionCode {
    type Err = ConfigError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidActionCode {
            code: code.to_string(),
            reason,
        };

        let chars: Vec<char> = code.chars().collect();
        if chars.len() != 3 {
            return Err(invalid(format!(
                "expected 3 characters, got {}",
                chars.len()
            )));
        }

        let mut flags = [false; 3];
        for (idx, (ch, (letter, name))) in chars
            .iter()
            .zip([('i', "insert"), ('s', "select"), ('u', "update")])
            .enumerate()
        {
            flags[idx] = match *ch {
                c if c == letter => true,
                '-' => false,
                other => {
                    return Err(invalid(format!(
                        "position {idx} ({name}) must be '{letter}' or '-', got '{other}'"
                    )))
                }
            };
        }

        Ok(ActionCode {
            insert: flags[0],
            select: flags[1],
            update: flags[2],
        })
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = if self.insert { 'i' } else { '-' };
        let s = if self.select { 's' } else { '-' };
        let u = if self.update { 'u' } else { '-' };
        write!(f, "{i}{s}{u}")
    }
}

impl Serialize for ActionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which write actions a preset value applies to: `i-`, `-u` or `iu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetActions {
    /// Fill the column on insert.
    pub insert: bool,
    /// Fill the column on update.
    pub update: bool,
}

impl FromStr for PresetActions {
    type Err = ConfigError;

    fn from_str(actions: &str) -> Result<Self, Self::Err> {
        match actions {
            "i-" => Ok(PresetActions {
                insert: true,
                update: false,
            }),
            "-u" => Ok(PresetActions {
                insert: false,
                update: true,
            }),
            "iu" => Ok(PresetActions {
                insert: true,
                update: true,
            }),
            _ => Err(ConfigError::InvalidPresetActions {
                actions: actions.to_string(),
            }),
        }
    }
}

impl fmt::Display for PresetActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = if self.insert { 'i' } else { '-' };
        let u = if self.update { 'u' } else { '-' };
        write!(f, "{i}{u}")
    }
}

impl Serialize for PresetActions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PresetActions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
