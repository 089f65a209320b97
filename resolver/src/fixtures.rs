use crate::lookup::DirectoryLookup;
use directory::{NodeKind, OrgRecord, OrgTree};
use manifest::{IgnoreKind, Manifest, ManifestFormat, ManifestLoader, PrincipalKind};

/// root
/// ├── workloads (OU)
/// │   ├── prod (OU)
/// │   │   └── 333 prod-app
/// │   ├── 111 dev-app
/// │   └── 222 test-app
/// └── 444 management
pub(crate) fn sample_tree() -> OrgTree {
    OrgTree::build(vec![
        OrgRecord::new("r-root", "root", NodeKind::Root, None),
        OrgRecord::new("ou-work", "workloads", NodeKind::Ou, Some("r-root")),
        OrgRecord::new("ou-prod", "prod", NodeKind::Ou, Some("ou-work")),
        OrgRecord::new("333", "prod-app", NodeKind::Account, Some("ou-prod")),
        OrgRecord::new("111", "dev-app", NodeKind::Account, Some("ou-work")),
        OrgRecord::new("222", "test-app", NodeKind::Account, Some("ou-work")),
        OrgRecord::new("444", "management", NodeKind::Account, Some("r-root")),
    ])
    .unwrap()
}

pub(crate) fn sample_lookup() -> DirectoryLookup {
    let mut lookup = DirectoryLookup::default();
    lookup.principals.insert(PrincipalKind::Group, "devs", "g-devs");
    lookup.principals.insert(PrincipalKind::Group, "contractors", "g-contractors");
    lookup.principals.insert(PrincipalKind::User, "alice", "u-alice");
    lookup.permission_sets.insert("ReadOnly", "ps-ro");
    lookup.permission_sets.insert("Admin", "ps-admin");
    lookup.permission_sets.insert("Billing", "ps-billing");
    lookup.record_ambiguous(
        IgnoreKind::User,
        "sam",
        vec!["u-sam-1".to_string(), "u-sam-2".to_string()],
    );
    lookup
}

pub(crate) fn parse_manifest(yaml: &str) -> Manifest {
    ManifestLoader::from_str(yaml, ManifestFormat::Yaml).unwrap()
}
