use crate::error::{ManifestError, Result, ValidationReport};
use crate::model::{IgnoreEntry, IgnoreKind, Inherit, Manifest, PrincipalKind, Rule, RuleKind, TargetKind};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

const TOP_LEVEL_KEYS: &[&str] = &["ignore", "rbac_rules"];
const IGNORE_KEYS: &[&str] = &["target_type", "target_names"];
const RULE_KEYS: &[&str] = &[
    "target_type",
    "target_names",
    "permission_set_name",
    "principal_name",
    "principal_type",
    "rule_type",
    "inherit",
    "nested",
];

const RULE_TARGET_TYPES: &[&str] = &["OU", "ACCOUNT"];
const IGNORE_TARGET_TYPES: &[&str] = &["OU", "ACCOUNT", "USER", "GROUP", "PERMISSION_SET"];
const PRINCIPAL_TYPES: &[&str] = &["USER", "GROUP"];
const RULE_TYPES: &[&str] = &["EXPLICIT", "IMPLICIT"];
const INHERIT_MODES: &[&str] = &["NONE", "FULL", "LIMITED"];

/// Structural validator for raw manifest documents.
///
/// Validation never stops at the first problem: every violation is collected
/// into a single [`ValidationReport`] so a manifest can be fixed in one pass.
/// Whether referenced OUs, accounts, principals and permission sets exist is
/// not checked here.
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validate a raw document and convert it into a typed [`Manifest`]
    pub fn validate(raw: &JsonValue) -> Result<Manifest> {
        let mut report = ValidationReport::default();

        let root = match raw.as_object() {
            Some(root) => root,
            None => {
                report.push("$", "manifest must be a mapping with 'rbac_rules' and optional 'ignore'");
                return Err(ManifestError::Structural(report));
            }
        };

        Self::check_unknown_keys(root, TOP_LEVEL_KEYS, "", &mut report);

        let ignore = match root.get("ignore") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(entries)) => entries
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| {
                    Self::validate_ignore_entry(&format!("ignore[{}]", i), entry, &mut report)
                })
                .collect(),
            Some(_) => {
                report.push("ignore", "expected an array");
                Vec::new()
            }
        };

        let rbac_rules = match root.get("rbac_rules") {
            None => {
                report.push("rbac_rules", "missing required field");
                Vec::new()
            }
            Some(JsonValue::Array(rules)) => rules
                .iter()
                .enumerate()
                .filter_map(|(i, rule)| {
                    Self::validate_rule(&format!("rbac_rules[{}]", i), rule, &mut report)
                })
                .collect(),
            Some(_) => {
                report.push("rbac_rules", "expected an array");
                Vec::new()
            }
        };

        if !report.is_empty() {
            debug!("Manifest rejected with {} violation(s)", report.len());
            return Err(ManifestError::Structural(report));
        }

        Ok(Manifest { ignore, rbac_rules })
    }

    fn validate_ignore_entry(
        path: &str,
        entry: &JsonValue,
        report: &mut ValidationReport,
    ) -> Option<IgnoreEntry> {
        let obj = match entry.as_object() {
            Some(obj) => obj,
            None => {
                report.push(path, "expected a mapping");
                return None;
            }
        };

        Self::check_unknown_keys(obj, IGNORE_KEYS, path, report);

        let target_kind = Self::required_enum(
            obj,
            "target_type",
            path,
            IGNORE_TARGET_TYPES,
            IgnoreKind::parse,
            report,
        );
        let target_names = Self::target_names(obj, path, report);

        Some(IgnoreEntry {
            target_kind: target_kind?,
            target_names: target_names?,
        })
    }

    fn validate_rule(path: &str, rule: &JsonValue, report: &mut ValidationReport) -> Option<Rule> {
        let obj = match rule.as_object() {
            Some(obj) => obj,
            None => {
                report.push(path, "expected a mapping");
                return None;
            }
        };

        Self::check_unknown_keys(obj, RULE_KEYS, path, report);

        let target_kind = Self::required_enum(
            obj,
            "target_type",
            path,
            RULE_TARGET_TYPES,
            TargetKind::parse,
            report,
        );
        let target_names = Self::target_names(obj, path, report);
        let permission_set_name = Self::required_string(obj, "permission_set_name", path, report);
        let principal_name = Self::required_string(obj, "principal_name", path, report);
        let principal_kind = Self::required_enum(
            obj,
            "principal_type",
            path,
            PRINCIPAL_TYPES,
            PrincipalKind::parse,
            report,
        );
        let rule_kind =
            Self::optional_enum(obj, "rule_type", path, RULE_TYPES, RuleKind::parse, report);
        let inherit =
            Self::optional_enum(obj, "inherit", path, INHERIT_MODES, Inherit::parse, report);
        let nested = Self::optional_bool(obj, "nested", path, report);

        let inherit = Self::reconcile_inheritance(path, target_kind, inherit, nested, report);

        Some(Rule {
            target_kind: target_kind?,
            target_names: target_names?,
            permission_set_name: permission_set_name?,
            principal_name: principal_name?,
            principal_kind: principal_kind?,
            rule_kind: rule_kind.ok()?.unwrap_or_default(),
            inherit: inherit?,
        })
    }

    /// Combine `inherit` and the legacy `nested` flag into one mode
    fn reconcile_inheritance(
        path: &str,
        target_kind: Option<TargetKind>,
        inherit: std::result::Result<Option<Inherit>, ()>,
        nested: std::result::Result<Option<bool>, ()>,
        report: &mut ValidationReport,
    ) -> Option<Inherit> {
        let inherit = inherit.ok()?;
        let nested = nested.ok()?;

        if target_kind == Some(TargetKind::Account) && nested == Some(true) {
            report.push(
                format!("{}.nested", path),
                "nested inheritance is only meaningful for OU targets",
            );
            return None;
        }

        match (inherit, nested) {
            (Some(mode), Some(flag)) => {
                let consistent = match mode {
                    Inherit::Full => flag,
                    Inherit::Limited | Inherit::None => !flag,
                };
                if consistent {
                    Some(mode)
                } else {
                    report.push(
                        format!("{}.nested", path),
                        format!("conflicts with inherit '{}'", mode),
                    );
                    None
                }
            }
            (Some(mode), None) => Some(mode),
            (None, Some(flag)) => Some(Inherit::from_nested(flag)),
            (None, None) => Some(Inherit::default()),
        }
    }

    fn check_unknown_keys(
        obj: &Map<String, JsonValue>,
        allowed: &[&str],
        path: &str,
        report: &mut ValidationReport,
    ) {
        for key in obj.keys() {
            if !allowed.contains(&key.as_str()) {
                report.push(Self::join(path, key), "unknown field");
            }
        }
    }

    fn required_string(
        obj: &Map<String, JsonValue>,
        key: &str,
        path: &str,
        report: &mut ValidationReport,
    ) -> Option<String> {
        let field_path = Self::join(path, key);
        match obj.get(key) {
            None | Some(JsonValue::Null) => {
                report.push(field_path, "missing required field");
                None
            }
            Some(JsonValue::String(value)) if value.trim().is_empty() => {
                report.push(field_path, "must not be empty");
                None
            }
            Some(JsonValue::String(value)) => Some(value.trim().to_string()),
            Some(_) => {
                report.push(field_path, "expected a string");
                None
            }
        }
    }

    fn required_enum<T>(
        obj: &Map<String, JsonValue>,
        key: &str,
        path: &str,
        allowed: &[&str],
        parse: fn(&str) -> Option<T>,
        report: &mut ValidationReport,
    ) -> Option<T> {
        match Self::optional_enum(obj, key, path, allowed, parse, report) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                report.push(Self::join(path, key), "missing required field");
                None
            }
            Err(()) => None,
        }
    }

    /// `Ok(None)` when absent, `Err(())` when present but invalid (already reported)
    fn optional_enum<T>(
        obj: &Map<String, JsonValue>,
        key: &str,
        path: &str,
        allowed: &[&str],
        parse: fn(&str) -> Option<T>,
        report: &mut ValidationReport,
    ) -> std::result::Result<Option<T>, ()> {
        let field_path = Self::join(path, key);
        match obj.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(raw)) => {
                let normalized = raw.trim().to_ascii_uppercase();
                match parse(&normalized) {
                    Some(value) => Ok(Some(value)),
                    None => {
                        report.push(
                            field_path,
                            format!("unknown value '{}', expected one of {}", raw, allowed.join(", ")),
                        );
                        Err(())
                    }
                }
            }
            Some(_) => {
                report.push(field_path, "expected a string");
                Err(())
            }
        }
    }

    fn optional_bool(
        obj: &Map<String, JsonValue>,
        key: &str,
        path: &str,
        report: &mut ValidationReport,
    ) -> std::result::Result<Option<bool>, ()> {
        match obj.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => {
                report.push(Self::join(path, key), "expected a boolean");
                Err(())
            }
        }
    }

    fn target_names(
        obj: &Map<String, JsonValue>,
        path: &str,
        report: &mut ValidationReport,
    ) -> Option<Vec<String>> {
        let field_path = Self::join(path, "target_names");
        let items = match obj.get("target_names") {
            None | Some(JsonValue::Null) => {
                report.push(field_path, "missing required field");
                return None;
            }
            Some(JsonValue::Array(items)) => items,
            Some(_) => {
                report.push(field_path, "expected an array of names");
                return None;
            }
        };

        if items.is_empty() {
            report.push(field_path, "must contain at least one name");
            return None;
        }

        let mut names = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_str().map(str::trim) {
                Some(name) if !name.is_empty() => names.push(name.to_string()),
                Some(_) => {
                    report.push(format!("{}[{}]", field_path, i), "must not be empty");
                    valid = false;
                }
                None => {
                    report.push(format!("{}[{}]", field_path, i), "expected a string");
                    valid = false;
                }
            }
        }

        valid.then_some(names)
    }

    fn join(path: &str, key: &str) -> String {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    }
}
