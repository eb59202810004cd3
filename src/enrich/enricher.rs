//! Per-resource enrichment state machine

use crate::config::ExtractionPolicy;
use crate::enrich::attributes as attrs;
use crate::enrich::resolver::ObjectResolver;
use crate::enrich::resource::ResourceAttributes;
use crate::error::{CfEnricherError, Result};
use crate::platform::{Application, ObjectKind, Organization, PlatformApi, Space};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Walks a resource's identity attribute, resolves the object chain
/// (app → space → org) and writes namespaced attributes back.
///
/// At most one of two paths applies per resource: the app path when the
/// app identity attribute is present, otherwise the space path. A
/// resource carrying neither identity attribute is left untouched.
/// Writes are upserts, so enriching the same resource twice with
/// unchanged upstream data yields identical attributes.
pub struct ResourceEnricher<C> {
    resolver: ObjectResolver<C>,
    policy: ExtractionPolicy,
}

impl<C: PlatformApi> ResourceEnricher<C> {
    pub fn new(resolver: ObjectResolver<C>, policy: ExtractionPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    /// Enrich one resource. Any resolution failure along the chosen path
    /// aborts enrichment for this resource and returns the error; the
    /// caller decides whether that fails the batch.
    pub async fn enrich<R: ResourceAttributes>(
        &self,
        resource: &mut R,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let app_id = identity_attribute(resource, &self.policy.app_id_attribute);
        if let Some(app_id) = app_id {
            return self.enrich_from_app(resource, &app_id, cancel).await;
        }

        if self.policy.include_space_metadata {
            let space_id = identity_attribute(resource, &self.policy.space_id_attribute);
            if let Some(space_id) = space_id {
                return self.enrich_from_space(resource, &space_id, cancel).await;
            }
        }

        // No identity attribute: nothing to enrich, not an error
        Ok(())
    }

    async fn enrich_from_app<R: ResourceAttributes>(
        &self,
        resource: &mut R,
        app_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let app = self.resolve_application(app_id, cancel).await?;

        tracing::debug!(app_id = %app_id, app = %app.name, "Enriching resource from application");

        resource.set_attribute(attrs::APP_NAME, app.name.clone());

        if self.policy.include_app_metadata {
            write_pairs(resource, attrs::APP_LABELS_PREFIX, &app.labels);
            write_pairs(resource, attrs::APP_ANNOTATIONS_PREFIX, &app.annotations);
        }

        if self.policy.app_state_lifecycle {
            resource.set_attribute(attrs::APP_STATE, app.state.clone());
            resource.set_attribute(attrs::APP_LIFECYCLE_TYPE, app.lifecycle_type.clone());
            resource.set_attribute(attrs::APP_LIFECYCLE_STACK, app.stack.clone());
            for (index, buildpack) in app.buildpacks.iter().enumerate() {
                resource.set_attribute(
                    &format!("{}{}", attrs::APP_LIFECYCLE_BUILDPACKS_PREFIX, index),
                    buildpack.clone(),
                );
            }
        }

        if self.policy.app_dates {
            resource.set_attribute(attrs::APP_CREATED, app.created_at.to_rfc3339());
            resource.set_attribute(attrs::APP_UPDATED, app.updated_at.to_rfc3339());
        }

        if self.policy.include_space_metadata {
            let space = self.resolve_space(&app.space_id, cancel).await?;
            apply_space(resource, &space);

            if self.policy.include_org_metadata {
                let org = self.resolve_organization(&space.org_id, cancel).await?;
                apply_org(resource, &org);
            }
        }

        Ok(())
    }

    async fn enrich_from_space<R: ResourceAttributes>(
        &self,
        resource: &mut R,
        space_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let space = self.resolve_space(space_id, cancel).await?;

        tracing::debug!(space_id = %space_id, space = %space.name, "Enriching resource from space");

        apply_space(resource, &space);

        if self.policy.include_org_metadata {
            let org = self.resolve_organization(&space.org_id, cancel).await?;
            apply_org(resource, &org);
        }

        Ok(())
    }

    async fn resolve_application(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Application> {
        self.resolver
            .resolve(ObjectKind::Application, id, cancel)
            .await?
            .into_application()
            .ok_or_else(|| wrong_kind(ObjectKind::Application, id))
    }

    async fn resolve_space(&self, id: &str, cancel: &CancellationToken) -> Result<Space> {
        self.resolver
            .resolve(ObjectKind::Space, id, cancel)
            .await?
            .into_space()
            .ok_or_else(|| wrong_kind(ObjectKind::Space, id))
    }

    async fn resolve_organization(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Organization> {
        self.resolver
            .resolve(ObjectKind::Organization, id, cancel)
            .await?
            .into_organization()
            .ok_or_else(|| wrong_kind(ObjectKind::Organization, id))
    }
}

fn identity_attribute<R: ResourceAttributes>(resource: &R, key: &str) -> Option<String> {
    resource
        .attribute(key)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn apply_space<R: ResourceAttributes>(resource: &mut R, space: &Space) {
    resource.set_attribute(attrs::SPACE_NAME, space.name.clone());
    write_pairs(resource, attrs::SPACE_LABELS_PREFIX, &space.labels);
    write_pairs(resource, attrs::SPACE_ANNOTATIONS_PREFIX, &space.annotations);
}

fn apply_org<R: ResourceAttributes>(resource: &mut R, org: &Organization) {
    resource.set_attribute(attrs::ORG_NAME, org.name.clone());
    write_pairs(resource, attrs::ORG_LABELS_PREFIX, &org.labels);
    write_pairs(resource, attrs::ORG_ANNOTATIONS_PREFIX, &org.annotations);
}

fn write_pairs<R: ResourceAttributes>(
    resource: &mut R,
    prefix: &str,
    pairs: &HashMap<String, String>,
) {
    for (key, value) in pairs {
        resource.set_attribute(&format!("{prefix}{key}"), value.clone());
    }
}

fn wrong_kind(kind: ObjectKind, id: &str) -> CfEnricherError {
    CfEnricherError::Internal(format!(
        "object resolved for {} is not a {kind}",
        kind.cache_key(id)
    ))
}
