//! Domain records fetched from the Cloud Foundry API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kinds of platform objects the enricher resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Application,
    Space,
    Organization,
}

impl ObjectKind {
    /// Short name used in cache keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Application => "app",
            ObjectKind::Space => "space",
            ObjectKind::Organization => "org",
        }
    }

    /// Cache key for an object of this kind, e.g. `app:3f1d…`.
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Cloud Foundry application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,

    /// Requested state, e.g. "STARTED" or "STOPPED"
    pub state: String,

    /// Lifecycle type, e.g. "buildpack" or "docker"
    pub lifecycle_type: String,

    /// Buildpacks in staging order
    pub buildpacks: Vec<String>,
    pub stack: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Owning space
    pub space_id: String,

    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// A Cloud Foundry space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,

    /// Owning organization
    pub org_id: String,

    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// A Cloud Foundry organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// Tagged union over the three object kinds.
///
/// This is the value serialized into the metadata cache, so the cache
/// stays kind-agnostic while round-trips stay lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformObject {
    Application(Application),
    Space(Space),
    Organization(Organization),
}

impl PlatformObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            PlatformObject::Application(_) => ObjectKind::Application,
            PlatformObject::Space(_) => ObjectKind::Space,
            PlatformObject::Organization(_) => ObjectKind::Organization,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PlatformObject::Application(app) => &app.id,
            PlatformObject::Space(space) => &space.id,
            PlatformObject::Organization(org) => &org.id,
        }
    }

    pub fn into_application(self) -> Option<Application> {
        match self {
            PlatformObject::Application(app) => Some(app),
            _ => None,
        }
    }

    pub fn into_space(self) -> Option<Space> {
        match self {
            PlatformObject::Space(space) => Some(space),
            _ => None,
        }
    }

    pub fn into_organization(self) -> Option<Organization> {
        match self {
            PlatformObject::Organization(org) => Some(org),
            _ => None,
        }
    }
}
