// src/labels.rs
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::OrganizationLabels;
use crate::roles::Role;
use crate::supabase_client::SupabaseError;

#[async_trait]
pub trait LabelStore: Send + Sync {
    /// The organization's override row, `None` when it never configured one.
    async fn organization_labels(
        &self,
        organization_id: &str,
    ) -> Result<Option<OrganizationLabels>, SupabaseError>;

    /// Creates or replaces the organization's override row.
    async fn save_organization_labels(
        &self,
        labels: &OrganizationLabels,
    ) -> Result<OrganizationLabels, SupabaseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Department,
    Program,
}

impl EntityKind {
    fn default_label(self, plural: bool) -> &'static str {
        match (self, plural) {
            (EntityKind::Department, false) => "Department",
            (EntityKind::Department, true) => "Departments",
            (EntityKind::Program, false) => "Program",
            (EntityKind::Program, true) => "Programs",
        }
    }
}

/// Where the labels in use came from. Callers keep default behaviour in every
/// case; this only makes the fallback visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Configured,
    Defaults,
    FetchFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelResolver {
    labels: OrganizationLabels,
    source: LabelSource,
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self::defaults()
    }
}

impl LabelResolver {
    pub fn defaults() -> Self {
        Self {
            labels: OrganizationLabels::default(),
            source: LabelSource::Defaults,
        }
    }

    pub fn configured(labels: OrganizationLabels) -> Self {
        Self {
            labels,
            source: LabelSource::Configured,
        }
    }

    /// One fetch, no retry. A missing row or a failed fetch both resolve to
    /// the built-in defaults.
    pub async fn load<S: LabelStore + ?Sized>(store: &S, organization_id: Option<&str>) -> Self {
        let Some(organization_id) = organization_id else {
            return Self::defaults();
        };
        match store.organization_labels(organization_id).await {
            Ok(Some(labels)) => {
                debug!("Loaded label overrides for organization {}", organization_id);
                Self::configured(labels)
            }
            Ok(None) => Self::defaults(),
            Err(e) => {
                warn!(
                    "Failed to fetch labels for organization {}, using defaults: {}",
                    organization_id, e
                );
                Self {
                    labels: OrganizationLabels::default(),
                    source: LabelSource::FetchFailed,
                }
            }
        }
    }

    pub fn source(&self) -> LabelSource {
        self.source
    }

    pub fn role_label(&self, role: Role) -> &str {
        let configured = match role {
            Role::OrgAdmin => &self.labels.org_admin_label,
            Role::ProgramManager => &self.labels.program_manager_label,
            Role::Manager => &self.labels.manager_label,
            Role::Member => &self.labels.member_label,
        };
        non_blank(configured).unwrap_or_else(|| role.default_label())
    }

    pub fn entity_label(&self, entity: EntityKind, plural: bool) -> &str {
        let configured = match (entity, plural) {
            (EntityKind::Department, false) => &self.labels.department_label,
            (EntityKind::Department, true) => &self.labels.department_label_plural,
            (EntityKind::Program, false) => &self.labels.program_label,
            (EntityKind::Program, true) => &self.labels.program_label_plural,
        };
        non_blank(configured).unwrap_or_else(|| entity.default_label(plural))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// --- Cache ---

#[derive(Clone)]
pub struct LabelCache {
    entries: Arc<Mutex<HashMap<String, (Instant, LabelResolver)>>>,
    ttl: Duration,
}

impl LabelCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn resolver<S: LabelStore + ?Sized>(
        &self,
        store: &S,
        organization_id: Option<&str>,
    ) -> LabelResolver {
        let Some(org_id) = organization_id else {
            return LabelResolver::defaults();
        };

        {
            let guard = self.entries.lock().await;
            if let Some((loaded_at, resolver)) = guard.get(org_id) {
                if loaded_at.elapsed() < self.ttl {
                    debug!("Label cache HIT for organization {}", org_id);
                    return resolver.clone();
                }
            }
        }

        let resolver = LabelResolver::load(store, Some(org_id)).await;
        // A failed fetch is not cached so the next request tries again.
        if resolver.source() != LabelSource::FetchFailed {
            self.entries
                .lock()
                .await
                .insert(org_id.to_string(), (Instant::now(), resolver.clone()));
        }
        resolver
    }

    pub async fn invalidate(&self, organization_id: &str) {
        if self.entries.lock().await.remove(organization_id).is_some() {
            info!("Label cache INVALIDATED for organization {}", organization_id);
        }
    }
}
