pub mod desired_state;
pub mod error;
pub mod ignore;
pub mod lookup;
pub mod rule_resolver;

#[cfg(test)]
mod fixtures;

pub use desired_state::{DesiredState, DesiredStateBuilder};
pub use error::{InvalidReference, ReferenceProblem, ResolutionError, Result};
pub use ignore::IgnoreFilter;
pub use lookup::{DirectoryLookup, Lookup};
pub use rule_resolver::{Resolution, ResolvedGrant, RuleResolver};
