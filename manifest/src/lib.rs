pub mod error;
pub mod loader;
pub mod model;
pub mod validation;

pub use error::{ManifestError, Result, ValidationReport, Violation};
pub use loader::{ManifestFormat, ManifestLoader};
pub use model::{
    IgnoreEntry, IgnoreKind, Inherit, Manifest, PrincipalKind, Rule, RuleKind, TargetKind,
};
pub use validation::ManifestValidator;
