// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource graph model.
//!
//! A [`ResourceSpec`] declares a resource before it exists. Values known only
//! after another resource is realized (endpoints, identifiers) are written as
//! [`AttrValue::Ref`] promises; the planner binds them during its ordered
//! realization pass and hands the provider a fully [`ResolvedSpec`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::PlanError;

/// Logical identifier of a resource within one stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Promise for an attribute this resource will expose once realized.
    pub fn attr(&self, attribute: impl Into<String>) -> AttrRef {
        AttrRef {
            resource: self.clone(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kinds of resource the fixed stack is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Network,
    AccessRule,
    Secret,
    DatabaseCluster,
    ComputeFunction,
    ApiEndpoint,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::AccessRule => "access-rule",
            Self::Secret => "secret",
            Self::DatabaseCluster => "database-cluster",
            Self::ComputeFunction => "compute-function",
            Self::ApiEndpoint => "api-endpoint",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an attribute resolved only after its owner is realized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrRef {
    pub resource: LogicalId,
    pub attribute: String,
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Replace a placeholder endpoint host reported by offline emulators.
///
/// Returns `replacement` when `host` equals `placeholder`, otherwise `host`
/// unchanged. Idempotent as long as `placeholder != replacement`, which
/// [`HostOverride::new`] enforces.
pub fn apply_host_override(host: &str, placeholder: &str, replacement: &str) -> String {
    if host == placeholder {
        replacement.to_string()
    } else {
        host.to_string()
    }
}

/// Environment-specific host substitution, evaluated once at bind time.
#[derive(Debug, Clone, PartialEq)]
pub struct HostOverride {
    source: Box<AttrValue>,
    placeholder: String,
    replacement: String,
}

impl HostOverride {
    pub fn new(
        source: impl Into<AttrValue>,
        placeholder: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, PlanError> {
        let placeholder = placeholder.into();
        let replacement = replacement.into();
        if placeholder.is_empty() || replacement.is_empty() {
            return Err(PlanError::InvalidDefinition(
                "host override placeholder and replacement must be non-empty".to_string(),
            ));
        }
        if placeholder == replacement {
            return Err(PlanError::InvalidDefinition(format!(
                "host override replacement '{}' equals its placeholder",
                replacement
            )));
        }
        Ok(Self {
            source: Box::new(source.into()),
            placeholder,
            replacement,
        })
    }

    pub fn source(&self) -> &AttrValue {
        &self.source
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn apply(&self, host: &str) -> String {
        apply_host_override(host, &self.placeholder, &self.replacement)
    }
}

/// A property value in a resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A value known at definition time.
    Literal(Value),
    /// An attribute of an earlier resource.
    Ref(AttrRef),
    /// A field of another secret's payload, copied by the provider when this
    /// resource is created. The planner never reads the field itself.
    SecretField { secret: LogicalId, field: String },
    /// A host value passed through the placeholder substitution.
    HostOverride(HostOverride),
    List(Vec<AttrValue>),
    Object(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn secret_field(secret: &LogicalId, field: impl Into<String>) -> Self {
        Self::SecretField {
            secret: secret.clone(),
            field: field.into(),
        }
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, AttrValue)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Literal from any serializable value.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, PlanError> {
        serde_json::to_value(value)
            .map(Self::Literal)
            .map_err(|e| PlanError::InvalidDefinition(format!("unserializable property: {}", e)))
    }

    fn collect_resources(&self, out: &mut BTreeSet<LogicalId>) {
        match self {
            Self::Literal(_) => {}
            Self::Ref(r) => {
                out.insert(r.resource.clone());
            }
            Self::SecretField { secret, .. } => {
                out.insert(secret.clone());
            }
            Self::HostOverride(o) => o.source.collect_resources(out),
            Self::List(items) => items.iter().for_each(|v| v.collect_resources(out)),
            Self::Object(map) => map.values().for_each(|v| v.collect_resources(out)),
        }
    }
}

impl From<AttrRef> for AttrValue {
    fn from(r: AttrRef) -> Self {
        Self::Ref(r)
    }
}

impl From<HostOverride> for AttrValue {
    fn from(o: HostOverride) -> Self {
        Self::HostOverride(o)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Literal(Value::String(s.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Literal(Value::String(s))
    }
}

impl From<Value> for AttrValue {
    fn from(v: Value) -> Self {
        Self::Literal(v)
    }
}

/// Declaration of a desired resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub id: LogicalId,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, AttrValue>,
    /// Ordering-only dependencies not expressed through a property.
    pub depends_on: BTreeSet<LogicalId>,
}

impl ResourceSpec {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: LogicalId::new(id),
            kind,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    /// Every resource this one must be realized after.
    pub fn dependencies(&self) -> BTreeSet<LogicalId> {
        let mut deps = self.depends_on.clone();
        for value in self.properties.values() {
            value.collect_resources(&mut deps);
        }
        deps
    }
}

/// A value published once every resource is realized.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub name: String,
    pub value: AttrRef,
    pub description: Option<String>,
}

/// The full, ordered deployment graph.
#[derive(Debug, Clone)]
pub struct StackDefinition {
    pub name: String,
    pub resources: Vec<ResourceSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl StackDefinition {
    pub fn resource(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.id.as_str() == id)
    }
}

/// A property value after binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Literal(Value),
    /// Copy-at-create reference, resolved by the provider.
    SecretField { secret_id: String, field: String },
    List(Vec<ResolvedValue>),
    Object(BTreeMap<String, ResolvedValue>),
}

impl ResolvedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResolvedValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ResolvedValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Plain JSON, or `None` if the value still carries a secret reference.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Literal(v) => Some(v.clone()),
            Self::SecretField { .. } => None,
            Self::List(items) => items
                .iter()
                .map(Self::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Self::Object(map) => map
                .iter()
                .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(Value::Object),
        }
    }
}

/// A resource declaration with every reference bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSpec {
    pub id: LogicalId,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, ResolvedValue>,
}

impl ResolvedSpec {
    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.properties.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ResolvedValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dependencies_include_refs_and_explicit() {
        let network = LogicalId::new("VPC");
        let secret = LogicalId::new("Creds");
        let rule = LogicalId::new("Rule");

        let spec = ResourceSpec::new("Cluster", ResourceKind::DatabaseCluster)
            .property("subnets", network.attr("isolated_subnet_ids"))
            .property(
                "nested",
                AttrValue::object([("password", AttrValue::secret_field(&secret, "password"))]),
            )
            .depends_on(&rule);

        let deps: Vec<_> = spec.dependencies().into_iter().collect();
        assert_eq!(deps, vec![secret, rule, network]);
    }

    #[test]
    fn test_host_override_rejects_identity() {
        let cluster = LogicalId::new("Cluster");
        let result = HostOverride::new(cluster.attr("endpoint_host"), "localhost", "localhost");
        assert!(matches!(result, Err(PlanError::InvalidDefinition(_))));
    }

    #[test]
    fn test_host_override_idempotent() {
        let cluster = LogicalId::new("Cluster");
        let o = HostOverride::new(cluster.attr("endpoint_host"), "localhost", "host.docker.internal")
            .unwrap();

        let once = o.apply("localhost");
        assert_eq!(once, "host.docker.internal");
        assert_eq!(o.apply(&once), once);

        assert_eq!(o.apply("db.cluster.aws"), "db.cluster.aws");
        assert_eq!(o.apply(&o.apply("db.cluster.aws")), "db.cluster.aws");
    }

    #[test]
    fn test_host_override_counts_source_dependency() {
        let cluster = LogicalId::new("Cluster");
        let o = HostOverride::new(cluster.attr("endpoint_host"), "a", "b").unwrap();
        let spec = ResourceSpec::new("Secret", ResourceKind::Secret).property("host", o);

        assert!(spec.dependencies().contains(&cluster));
    }

    #[test]
    fn test_resolved_to_json_stops_at_secret_field() {
        let plain = ResolvedValue::Object(BTreeMap::from([(
            "port".to_string(),
            ResolvedValue::Literal(json!("5432")),
        )]));
        assert_eq!(plain.to_json(), Some(json!({"port": "5432"})));

        let with_secret = ResolvedValue::List(vec![ResolvedValue::SecretField {
            secret_id: "arn".to_string(),
            field: "password".to_string(),
        }]);
        assert_eq!(with_secret.to_json(), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ResourceKind::AccessRule.as_str(), "access-rule");
        assert_eq!(
            serde_json::to_value(ResourceKind::DatabaseCluster).unwrap(),
            json!("database-cluster")
        );
    }
}
