use crate::config::{AuthType, CfConfig};
use crate::error::{CfEnricherError, Result};
use crate::platform::types::{Application, ObjectKind, Organization, PlatformObject, Space};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Object-fetch contract consumed by the resolver.
///
/// [`PlatformClient`] implements it against the live API; tests
/// substitute a mock with canned objects and call counters.
#[allow(async_fn_in_trait)]
pub trait PlatformApi {
    async fn fetch(
        &self,
        kind: ObjectKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<PlatformObject>;
}

/// Authenticated facade over the Cloud Foundry v3 API.
///
/// Authentication happens once at construction, with exactly one of the
/// three supported schemes. Fetches carry the bearer token and abort
/// with [`CfEnricherError::Canceled`] when the caller's cancellation
/// token fires. No retries are performed here.
pub struct PlatformClient {
    http: reqwest::Client,
    endpoint: String,
    bearer: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl PlatformClient {
    pub async fn connect(config: &CfConfig) -> Result<Self> {
        config.validate()?;

        // Initialize rustls crypto provider
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let http = reqwest::Client::builder().build().map_err(|e| {
            CfEnricherError::Config(format!(
                "could not create connection to Cloud Foundry: {e}"
            ))
        })?;

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let bearer = Self::authenticate(&http, &endpoint, config).await?;

        tracing::info!(endpoint = %endpoint, auth_type = %config.auth.auth_type, "Cloud Foundry client ready");

        Ok(Self {
            http,
            endpoint,
            bearer,
        })
    }

    /// Obtain an access token for the configured scheme. Token auth uses
    /// the supplied access token as-is; refresh is the platform login
    /// flow's concern, not ours.
    async fn authenticate(
        http: &reqwest::Client,
        endpoint: &str,
        config: &CfConfig,
    ) -> Result<String> {
        let auth = &config.auth;
        let token_url = format!("{endpoint}/oauth/token");

        let request = match auth.auth_type {
            AuthType::Token => return Ok(auth.access_token.clone()),
            AuthType::UserPass => http
                .post(&token_url)
                // Password grants go through the default `cf` client
                .basic_auth("cf", Some(""))
                .form(&[
                    ("grant_type", "password"),
                    ("username", auth.username.as_str()),
                    ("password", auth.password.as_str()),
                ]),
            AuthType::ClientCredentials => http
                .post(&token_url)
                .basic_auth(&auth.client_id, Some(&auth.client_secret))
                .form(&[("grant_type", "client_credentials")]),
        };

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                CfEnricherError::Config(format!(
                    "could not authenticate against Cloud Foundry: {e}"
                ))
            })?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            CfEnricherError::Config(format!(
                "could not authenticate against Cloud Foundry: {e}"
            ))
        })?;

        Ok(token.access_token)
    }

    async fn fetch_object(&self, kind: ObjectKind, id: &str) -> Result<PlatformObject> {
        let collection = match kind {
            ObjectKind::Application => "apps",
            ObjectKind::Space => "spaces",
            ObjectKind::Organization => "organizations",
        };
        let url = format!("{}/v3/{}/{}", self.endpoint, collection, id);

        tracing::debug!(kind = %kind, id = %id, "Fetching object from Cloud Foundry API");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(kind, id, e.to_string()))?;

        let object = match kind {
            ObjectKind::Application => {
                let resource: AppResource = response
                    .json()
                    .await
                    .map_err(|e| fetch_error(kind, id, e.to_string()))?;
                PlatformObject::Application(resource.into_domain())
            }
            ObjectKind::Space => {
                let resource: SpaceResource = response
                    .json()
                    .await
                    .map_err(|e| fetch_error(kind, id, e.to_string()))?;
                PlatformObject::Space(resource.into_domain())
            }
            ObjectKind::Organization => {
                let resource: OrgResource = response
                    .json()
                    .await
                    .map_err(|e| fetch_error(kind, id, e.to_string()))?;
                PlatformObject::Organization(resource.into_domain())
            }
        };

        Ok(object)
    }
}

impl PlatformApi for PlatformClient {
    async fn fetch(
        &self,
        kind: ObjectKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<PlatformObject> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(kind = %kind, id = %id, "Fetch canceled");
                Err(CfEnricherError::Canceled)
            }
            result = self.fetch_object(kind, id) => result,
        }
    }
}

fn fetch_error(kind: ObjectKind, id: &str, message: String) -> CfEnricherError {
    CfEnricherError::Fetch {
        kind,
        id: id.to_string(),
        message,
    }
}

// CF v3 wire format. Label and annotation values are nullable on the
// wire; null maps to an empty string in the domain model.

#[derive(Debug, Default, Deserialize)]
struct MetadataBlock {
    #[serde(default)]
    labels: HashMap<String, Option<String>>,
    #[serde(default)]
    annotations: HashMap<String, Option<String>>,
}

impl MetadataBlock {
    fn into_maps(self) -> (HashMap<String, String>, HashMap<String, String>) {
        (flatten(self.labels), flatten(self.annotations))
    }
}

fn flatten(map: HashMap<String, Option<String>>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: RelationshipData,
}

#[derive(Debug, Deserialize)]
struct RelationshipData {
    guid: String,
}

#[derive(Debug, Default, Deserialize)]
struct LifecycleData {
    #[serde(default)]
    buildpacks: Vec<String>,
    #[serde(default)]
    stack: String,
}

#[derive(Debug, Deserialize)]
struct Lifecycle {
    #[serde(rename = "type")]
    lifecycle_type: String,
    #[serde(default)]
    data: LifecycleData,
}

#[derive(Debug, Deserialize)]
struct AppResource {
    guid: String,
    name: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    lifecycle: Lifecycle,
    relationships: AppRelationships,
    #[serde(default)]
    metadata: MetadataBlock,
}

#[derive(Debug, Deserialize)]
struct AppRelationships {
    space: Relationship,
}

impl AppResource {
    fn into_domain(self) -> Application {
        let (labels, annotations) = self.metadata.into_maps();
        Application {
            id: self.guid,
            name: self.name,
            state: self.state,
            lifecycle_type: self.lifecycle.lifecycle_type,
            buildpacks: self.lifecycle.data.buildpacks,
            stack: self.lifecycle.data.stack,
            created_at: self.created_at,
            updated_at: self.updated_at,
            space_id: self.relationships.space.data.guid,
            labels,
            annotations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpaceResource {
    guid: String,
    name: String,
    relationships: SpaceRelationships,
    #[serde(default)]
    metadata: MetadataBlock,
}

#[derive(Debug, Deserialize)]
struct SpaceRelationships {
    organization: Relationship,
}

impl SpaceResource {
    fn into_domain(self) -> Space {
        let (labels, annotations) = self.metadata.into_maps();
        Space {
            id: self.guid,
            name: self.name,
            org_id: self.relationships.organization.data.guid,
            labels,
            annotations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrgResource {
    guid: String,
    name: String,
    #[serde(default)]
    metadata: MetadataBlock,
}

impl OrgResource {
    fn into_domain(self) -> Organization {
        let (labels, annotations) = self.metadata.into_maps();
        Organization {
            id: self.guid,
            name: self.name,
            labels,
            annotations,
        }
    }
}
