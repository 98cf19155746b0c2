// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource graph planner.
//!
//! Realizes an ordered [`StackDefinition`] one resource at a time. Before each
//! `create`, every [`AttrValue::Ref`] in the declaration is bound to an
//! attribute of an already-realized resource; nothing is ever read from a
//! resource that does not exist yet.
//!
//! ```text
//!   VPC ──► DbSecurityGroup ──┐
//!    │                        ▼
//!    └──────────────────► serverless-db ◄── DBCredentialsSecret
//!                             │                   │
//!                  endpoint   ▼        password   │
//!                       DBRuntimeSecret ◄─────────┘
//!                             │ arn
//!                             ▼
//!                           Lambda ──► Api ──► ApiUrl
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::PlanError;
use crate::graph::{
    AttrRef, AttrValue, LogicalId, ResolvedSpec, ResolvedValue, ResourceKind, ResourceSpec,
    StackDefinition,
};
use crate::provider::{ResourceHandle, ResourceProvider};
use crate::resources::attrs;

/// Outcome of a successful plan.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub stack_name: String,
    /// Realized resources, in realization order
    pub resources: Vec<ResourceHandle>,
    /// Published outputs, resolved after every resource was realized
    pub outputs: BTreeMap<String, String>,
}

impl Deployment {
    pub fn resource(&self, logical_id: &str) -> Option<&ResourceHandle> {
        self.resources
            .iter()
            .find(|r| r.logical_id.as_str() == logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).map(String::as_str)
    }
}

/// Drives a [`ResourceProvider`] through a stack definition.
pub struct Planner {
    provider: Arc<dyn ResourceProvider>,
}

impl Planner {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }

    /// Assert every resource only depends on resources declared before it.
    ///
    /// With a fixed, ordered graph this is the only cycle protection needed: a
    /// cycle necessarily contains a backwards edge.
    pub fn check_order(resources: &[ResourceSpec]) -> Result<(), PlanError> {
        let mut declared: HashSet<&LogicalId> = HashSet::new();

        for spec in resources {
            for dependency in spec.dependencies() {
                if !declared.contains(&dependency) {
                    return Err(PlanError::OutOfOrder {
                        resource: spec.id.clone(),
                        missing: dependency,
                    });
                }
            }
            if !declared.insert(&spec.id) {
                return Err(PlanError::DuplicateResource(spec.id.clone()));
            }
        }

        Ok(())
    }

    /// Realize every resource in order and resolve the stack outputs.
    ///
    /// The first realization failure aborts the plan. Resources realized
    /// before it are left in place and reported in the log; compensating for
    /// them is up to the provider.
    pub async fn plan(&self, definition: &StackDefinition) -> Result<Deployment, PlanError> {
        Self::check_order(&definition.resources)?;
        for output in &definition.outputs {
            if definition.resource(output.value.resource.as_str()).is_none() {
                return Err(PlanError::InvalidDefinition(format!(
                    "output {} references undeclared resource {}",
                    output.name, output.value.resource
                )));
            }
        }

        info!(
            stack = %definition.name,
            provider = self.provider.provider_type(),
            resources = definition.resources.len(),
            "Planning stack"
        );

        let mut bindings = Bindings::default();
        let mut realized: Vec<ResourceHandle> = Vec::with_capacity(definition.resources.len());

        for spec in &definition.resources {
            let resolved = bindings.resolve_spec(spec)?;
            debug!(resource = %spec.id, kind = %spec.kind, "Realizing resource");

            let handle = match self.provider.create(&resolved).await {
                Ok(handle) => handle,
                Err(source) => {
                    error!(
                        resource = %spec.id,
                        kind = %spec.kind,
                        error = %source,
                        "Resource realization failed, aborting plan"
                    );
                    if !realized.is_empty() {
                        let left: Vec<&str> =
                            realized.iter().map(|h| h.logical_id.as_str()).collect();
                        warn!(realized = ?left, "Plan aborted with resources already realized");
                    }
                    return Err(PlanError::Realization {
                        resource: spec.id.clone(),
                        source,
                    });
                }
            };

            info!(
                resource = %spec.id,
                kind = %spec.kind,
                physical_id = %handle.physical_id,
                "Resource realized"
            );
            bindings.insert(handle.clone());
            realized.push(handle);
        }

        let mut outputs = BTreeMap::new();
        for output in &definition.outputs {
            let value = bindings.lookup(&LogicalId::new(&output.name), &output.value)?;
            info!(output = %output.name, value = %value, "Stack output");
            outputs.insert(output.name.clone(), value.to_string());
        }

        Ok(Deployment {
            stack_name: definition.name.clone(),
            resources: realized,
            outputs,
        })
    }
}

/// Attributes of realized resources, by logical id.
#[derive(Default)]
struct Bindings {
    handles: HashMap<LogicalId, ResourceHandle>,
}

impl Bindings {
    fn insert(&mut self, handle: ResourceHandle) {
        self.handles.insert(handle.logical_id.clone(), handle);
    }

    fn lookup(&self, owner: &LogicalId, reference: &AttrRef) -> Result<&str, PlanError> {
        self.handles
            .get(&reference.resource)
            .and_then(|h| h.attribute(&reference.attribute))
            .ok_or_else(|| PlanError::UnresolvedAttribute {
                resource: owner.clone(),
                reference: reference.clone(),
            })
    }

    fn resolve_spec(&self, spec: &ResourceSpec) -> Result<ResolvedSpec, PlanError> {
        let properties = spec
            .properties
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve(&spec.id, value)?)))
            .collect::<Result<BTreeMap<_, _>, PlanError>>()?;

        Ok(ResolvedSpec {
            id: spec.id.clone(),
            kind: spec.kind,
            properties,
        })
    }

    fn resolve(&self, owner: &LogicalId, value: &AttrValue) -> Result<ResolvedValue, PlanError> {
        match value {
            AttrValue::Literal(v) => Ok(ResolvedValue::Literal(v.clone())),
            AttrValue::Ref(reference) => Ok(ResolvedValue::Literal(
                self.lookup(owner, reference)?.into(),
            )),
            AttrValue::SecretField { secret, field } => {
                let handle = self.handles.get(secret).ok_or_else(|| {
                    PlanError::UnresolvedAttribute {
                        resource: owner.clone(),
                        reference: secret.attr(attrs::ARN),
                    }
                })?;
                if handle.kind != ResourceKind::Secret {
                    return Err(PlanError::InvalidDefinition(format!(
                        "{} copies field '{}' from {}, which is a {}, not a secret",
                        owner, field, secret, handle.kind
                    )));
                }
                Ok(ResolvedValue::SecretField {
                    secret_id: self.lookup(owner, &secret.attr(attrs::ARN))?.to_string(),
                    field: field.clone(),
                })
            }
            AttrValue::HostOverride(host_override) => {
                let host = match self.resolve(owner, host_override.source())? {
                    ResolvedValue::Literal(serde_json::Value::String(host)) => host,
                    _ => {
                        return Err(PlanError::InvalidDefinition(format!(
                            "host override in {} must resolve to a string",
                            owner
                        )));
                    }
                };
                let resolved = host_override.apply(&host);
                if resolved != host {
                    info!(
                        resource = %owner,
                        placeholder = %host,
                        replacement = %resolved,
                        "Endpoint host overridden"
                    );
                }
                Ok(ResolvedValue::Literal(resolved.into()))
            }
            AttrValue::List(items) => items
                .iter()
                .map(|item| self.resolve(owner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(ResolvedValue::List),
            AttrValue::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.resolve(owner, v)?)))
                .collect::<Result<BTreeMap<_, _>, PlanError>>()
                .map(ResolvedValue::Object),
        }
    }
}
