//! Permission definitions.
//!
//! A [`Permission`] is an atomic, named capability such as `user.delete` or
//! `protocol:ssh.connect`. Definitions carry two kinds of edges to other
//! permissions:
//!
//! - `depends_on`: permissions that must also be held for this one to be usable.
//! - `implies`: permissions granted automatically whenever this one is granted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hint describing where a permission is normally granted.
///
/// Informational only: the checker does not enforce it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultScope {
    #[default]
    Global,
    Resource,
}

impl DefaultScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultScope::Global => "global",
            DefaultScope::Resource => "resource",
        }
    }

    /// Parse a persisted scope string. Unknown values fall back to `Global`.
    pub fn parse(value: &str) -> Self {
        match value {
            "resource" => DefaultScope::Resource,
            _ => DefaultScope::Global,
        }
    }
}

impl core::fmt::Display for DefaultScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered permission definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Globally unique identifier.
    pub id: String,

    /// Owning feature module, used for grouping and discovery.
    pub module: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub default_scope: DefaultScope,

    /// Permissions that must also be held for this one to be usable.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Permissions granted automatically alongside this one.
    #[serde(default)]
    pub implies: Vec<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Permission {
    /// Create a permission owned by `module`.
    pub fn new(id: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn implies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_scope(mut self, scope: DefaultScope) -> Self {
        self.default_scope = scope;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Trim the ID and edge lists, dropping blank and duplicate edges (first
    /// occurrence wins).
    pub(crate) fn normalize(&mut self) {
        if self.id.trim().len() != self.id.len() {
            self.id = self.id.trim().to_string();
        }
        self.depends_on = normalize_edges(std::mem::take(&mut self.depends_on));
        self.implies = normalize_edges(std::mem::take(&mut self.implies));
    }
}

fn normalize_edges(edges: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(edges.len());
    for edge in edges {
        let edge = edge.trim();
        if edge.is_empty() || out.iter().any(|e| e == edge) {
            continue;
        }
        out.push(edge.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_dedupes() {
        let mut perm = Permission::new(" user.delete\t", "core")
            .depends_on(["user.view", " user.edit ", "", "user.view", "   "])
            .implies(["audit.view", "audit.view"]);
        perm.normalize();

        assert_eq!(perm.id, "user.delete");
        assert_eq!(perm.depends_on, vec!["user.view", "user.edit"]);
        assert_eq!(perm.implies, vec!["audit.view"]);
    }

    #[test]
    fn test_default_scope_serde() {
        let json = serde_json::to_string(&DefaultScope::Resource).unwrap();
        assert_eq!(json, "\"resource\"");

        let perm: Permission =
            serde_json::from_str(r#"{"id":"connection.launch","module":"core"}"#).unwrap();
        assert_eq!(perm.default_scope, DefaultScope::Global);
        assert!(perm.depends_on.is_empty());
    }

    #[test]
    fn test_scope_parse_falls_back_to_global() {
        assert_eq!(DefaultScope::parse("resource"), DefaultScope::Resource);
        assert_eq!(DefaultScope::parse("global"), DefaultScope::Global);
        assert_eq!(DefaultScope::parse("tenant"), DefaultScope::Global);
    }
}
