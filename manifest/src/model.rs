use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of organization node a rule may target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Ou,
    Account,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Ou => "OU",
            TargetKind::Account => "ACCOUNT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OU" => Some(TargetKind::Ou),
            "ACCOUNT" => Some(TargetKind::Account),
            _ => None,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity kind that can receive an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "USER",
            PrincipalKind::Group => "GROUP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(PrincipalKind::User),
            "GROUP" => Some(PrincipalKind::Group),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precedence class of a rule. Explicit rules override implicit defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    #[default]
    Explicit,
    Implicit,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Explicit => "EXPLICIT",
            RuleKind::Implicit => "IMPLICIT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EXPLICIT" => Some(RuleKind::Explicit),
            "IMPLICIT" => Some(RuleKind::Implicit),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an OU-targeted rule propagates to the accounts below the OU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inherit {
    /// The OU itself only, which never holds accounts directly
    None,
    /// Every account transitively below the OU
    Full,
    /// Accounts that are direct children of the OU
    #[default]
    Limited,
}

impl Inherit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inherit::None => "NONE",
            Inherit::Full => "FULL",
            Inherit::Limited => "LIMITED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Inherit::None),
            "FULL" => Some(Inherit::Full),
            "LIMITED" => Some(Inherit::Limited),
            _ => None,
        }
    }

    /// Inheritance implied by the legacy `nested` flag
    pub fn from_nested(nested: bool) -> Self {
        if nested {
            Inherit::Full
        } else {
            Inherit::Limited
        }
    }
}

impl fmt::Display for Inherit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds an ignore entry can exclude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IgnoreKind {
    Ou,
    Account,
    User,
    Group,
    PermissionSet,
}

impl IgnoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreKind::Ou => "OU",
            IgnoreKind::Account => "ACCOUNT",
            IgnoreKind::User => "USER",
            IgnoreKind::Group => "GROUP",
            IgnoreKind::PermissionSet => "PERMISSION_SET",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OU" => Some(IgnoreKind::Ou),
            "ACCOUNT" => Some(IgnoreKind::Account),
            "USER" => Some(IgnoreKind::User),
            "GROUP" => Some(IgnoreKind::Group),
            "PERMISSION_SET" => Some(IgnoreKind::PermissionSet),
            _ => None,
        }
    }
}

impl From<TargetKind> for IgnoreKind {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Ou => IgnoreKind::Ou,
            TargetKind::Account => IgnoreKind::Account,
        }
    }
}

impl From<PrincipalKind> for IgnoreKind {
    fn from(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::User => IgnoreKind::User,
            PrincipalKind::Group => IgnoreKind::Group,
        }
    }
}

impl fmt::Display for IgnoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single assignment rule from `rbac_rules`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub target_kind: TargetKind,
    pub target_names: Vec<String>,
    pub permission_set_name: String,
    pub principal_name: String,
    pub principal_kind: PrincipalKind,
    #[serde(default)]
    pub rule_kind: RuleKind,
    #[serde(default)]
    pub inherit: Inherit,
}

/// A single entry from `ignore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreEntry {
    pub target_kind: IgnoreKind,
    pub target_names: Vec<String>,
}

/// A structurally valid access manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub ignore: Vec<IgnoreEntry>,
    pub rbac_rules: Vec<Rule>,
}

impl Manifest {
    /// Whether any ignore entry of `kind` lists `name`
    pub fn is_ignored(&self, kind: IgnoreKind, name: &str) -> bool {
        self.ignore
            .iter()
            .filter(|entry| entry.target_kind == kind)
            .any(|entry| entry.target_names.iter().any(|n| n == name))
    }

    /// All ignored names of a given kind
    pub fn ignored_names(&self, kind: IgnoreKind) -> impl Iterator<Item = &str> {
        self.ignore
            .iter()
            .filter(move |entry| entry.target_kind == kind)
            .flat_map(|entry| entry.target_names.iter().map(String::as_str))
    }
}
