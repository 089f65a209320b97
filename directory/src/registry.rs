use manifest::PrincipalKind;
use std::collections::HashMap;

/// Name/id lookups for the principals referenced by a run
#[derive(Debug, Clone, Default)]
pub struct PrincipalRegistry {
    by_name: HashMap<(PrincipalKind, String), String>,
    by_id: HashMap<String, (PrincipalKind, String)>,
}

impl PrincipalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: PrincipalKind, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        self.by_id.insert(id.clone(), (kind, name.clone()));
        self.by_name.insert((kind, name), id);
    }

    pub fn id_of(&self, kind: PrincipalKind, name: &str) -> Option<&str> {
        self.by_name
            .get(&(kind, name.to_string()))
            .map(String::as_str)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Name/id lookups for the permission sets referenced by a run
#[derive(Debug, Clone, Default)]
pub struct PermissionSetRegistry {
    by_name: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl PermissionSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        self.by_id.insert(id.clone(), name.clone());
        self.by_name.insert(name, id);
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
