//! Member selection options.
//!
//! Options arrive as string pairs from the user's configuration or from a
//! directive invocation. Parsing is strict: unknown names and bad values are
//! fatal. Merging is pure, so defaults plus the same overrides always give
//! the same effective configuration.

use std::collections::BTreeSet;

use crate::error::ConfigError;

/// The list-valued option names; each also accepts a `no-` prefixed form.
pub const LIST_OPTIONS: [&str; 8] = [
    "members",
    "undoc-members",
    "private-members",
    "protected-members",
    "package-members",
    "special-members",
    "inherited-members",
    "exclude-members",
];

/// How members are ordered within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberOrder {
    /// Case-insensitive by local name.
    Alphabetical,
    /// By kind group, then alphabetical within each group.
    Groupwise,
    /// By source position; location-less members after all positioned ones,
    /// in export order.
    #[default]
    Bysource,
}

impl MemberOrder {
    fn parse(name: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "alphabetical" => Ok(MemberOrder::Alphabetical),
            "groupwise" => Ok(MemberOrder::Groupwise),
            "bysource" => Ok(MemberOrder::Bysource),
            other => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: other.to_string(),
                reason: "expected one of 'alphabetical', 'groupwise', 'bysource'".to_string(),
            }),
        }
    }
}

/// One list-valued option as written in a directive, before merging with
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListSetting {
    /// Not mentioned; the default applies.
    #[default]
    Inherit,
    /// Flag form with no value: everything in this category.
    All,
    /// An explicit name list replacing the default.
    Names(BTreeSet<String>),
    /// A `+`-prefixed list extending the default.
    Extend(BTreeSet<String>),
    /// The `no-` form: category off, default discarded.
    Suppress,
}

impl ListSetting {
    fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return ListSetting::All;
        }
        match value.strip_prefix('+') {
            Some(rest) => ListSetting::Extend(split_names(rest)),
            None => ListSetting::Names(split_names(value)),
        }
    }
}

fn split_names(value: &str) -> BTreeSet<String> {
    let value = value.trim();
    let pieces: Vec<&str> = if value.contains(',') {
        value.split(',').collect()
    } else {
        value.split_whitespace().collect()
    };
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Options from a single source (defaults or one directive), each either set
/// or inherited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberOptions {
    pub members: ListSetting,
    pub undoc_members: ListSetting,
    pub private_members: ListSetting,
    pub protected_members: ListSetting,
    pub package_members: ListSetting,
    pub special_members: ListSetting,
    pub inherited_members: ListSetting,
    pub exclude_members: ListSetting,
    pub member_order: Option<MemberOrder>,
    pub module_member_order: Option<MemberOrder>,
    pub recursive: Option<bool>,
}

impl MemberOptions {
    /// Parse option pairs. Unknown names and malformed values are fatal.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = MemberOptions::default();
        for (name, value) in pairs {
            options.set(name, value)?;
        }
        Ok(options)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let (base, suppress) = match name.strip_prefix("no-") {
            Some(rest) if LIST_OPTIONS.contains(&rest) => (rest, true),
            _ => (name, false),
        };
        let setting = if suppress {
            ListSetting::Suppress
        } else {
            ListSetting::parse(value)
        };
        match base {
            "members" => self.members = setting,
            "undoc-members" => self.undoc_members = setting,
            "private-members" => self.private_members = setting,
            "protected-members" => self.protected_members = setting,
            "package-members" => self.package_members = setting,
            "special-members" => self.special_members = setting,
            "inherited-members" => self.inherited_members = setting,
            "exclude-members" => self.exclude_members = setting,
            "member-order" => self.member_order = Some(MemberOrder::parse(name, value)?),
            "module-member-order" => {
                self.module_member_order = Some(MemberOrder::parse(name, value)?)
            }
            "recursive" => {
                if !value.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        name: name.to_string(),
                        value: value.to_string(),
                        reason: "this option is a flag and takes no value".to_string(),
                    });
                }
                self.recursive = Some(true);
            }
            _ => {
                return Err(ConfigError::UnknownOption {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

/// A list option after merging: a category flag plus explicitly named
/// members that bypass all category filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListValue {
    pub all: bool,
    pub names: BTreeSet<String>,
}

impl ListValue {
    pub fn requested(&self) -> bool {
        self.all || !self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// The effective configuration a selection runs with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionConfig {
    pub members: ListValue,
    pub undoc_members: ListValue,
    pub private_members: ListValue,
    pub protected_members: ListValue,
    pub package_members: ListValue,
    pub special_members: ListValue,
    pub inherited_members: ListValue,
    pub exclude_members: ListValue,
    pub member_order: MemberOrder,
    pub module_member_order: Option<MemberOrder>,
    pub recursive: bool,
}

impl SelectionConfig {
    /// Merge directive overrides over defaults. Pure: no global state, and
    /// an `Extend` result is always a superset of the default names.
    pub fn merge(defaults: &SelectionConfig, overrides: &MemberOptions) -> SelectionConfig {
        SelectionConfig {
            members: merge_list(&defaults.members, &overrides.members),
            undoc_members: merge_list(&defaults.undoc_members, &overrides.undoc_members),
            private_members: merge_list(&defaults.private_members, &overrides.private_members),
            protected_members: merge_list(
                &defaults.protected_members,
                &overrides.protected_members,
            ),
            package_members: merge_list(&defaults.package_members, &overrides.package_members),
            special_members: merge_list(&defaults.special_members, &overrides.special_members),
            inherited_members: merge_list(
                &defaults.inherited_members,
                &overrides.inherited_members,
            ),
            exclude_members: merge_list(&defaults.exclude_members, &overrides.exclude_members),
            member_order: overrides.member_order.unwrap_or(defaults.member_order),
            module_member_order: overrides
                .module_member_order
                .or(defaults.module_member_order),
            recursive: overrides.recursive.unwrap_or(defaults.recursive),
        }
    }

    /// The options a recursive walk passes down to nested containers. Flags
    /// and orders propagate; explicit name lists apply only to the container
    /// they were written on.
    pub fn propagate(&self) -> MemberOptions {
        MemberOptions {
            members: propagate_list(&self.members),
            undoc_members: propagate_list(&self.undoc_members),
            private_members: propagate_list(&self.private_members),
            protected_members: propagate_list(&self.protected_members),
            package_members: propagate_list(&self.package_members),
            special_members: propagate_list(&self.special_members),
            inherited_members: propagate_list(&self.inherited_members),
            exclude_members: ListSetting::Inherit,
            member_order: Some(self.member_order),
            module_member_order: self.module_member_order,
            recursive: Some(self.recursive),
        }
    }
}

fn merge_list(default: &ListValue, setting: &ListSetting) -> ListValue {
    match setting {
        ListSetting::Inherit => default.clone(),
        ListSetting::All => ListValue {
            all: true,
            names: default.names.clone(),
        },
        ListSetting::Names(names) => ListValue {
            all: false,
            names: names.clone(),
        },
        ListSetting::Extend(names) => ListValue {
            all: default.all,
            names: default.names.union(names).cloned().collect(),
        },
        ListSetting::Suppress => ListValue::default(),
    }
}

fn propagate_list(value: &ListValue) -> ListSetting {
    if value.all {
        ListSetting::All
    } else {
        ListSetting::Inherit
    }
}
