//! Well-known attribute keys written under the `cloudfoundry.` namespace

pub const APP_NAME: &str = "cloudfoundry.app.name";
pub const APP_STATE: &str = "cloudfoundry.app.state";
pub const APP_CREATED: &str = "cloudfoundry.app.created";
pub const APP_UPDATED: &str = "cloudfoundry.app.updated";
pub const APP_LIFECYCLE_TYPE: &str = "cloudfoundry.app.lifecycle.type";
pub const APP_LIFECYCLE_STACK: &str = "cloudfoundry.app.lifecycle.stack";

/// Suffixed with the buildpack's position in staging order.
pub const APP_LIFECYCLE_BUILDPACKS_PREFIX: &str = "cloudfoundry.app.lifecycle.buildpacks.";

/// Suffixed with the label/annotation key.
pub const APP_LABELS_PREFIX: &str = "cloudfoundry.app.labels.";
pub const APP_ANNOTATIONS_PREFIX: &str = "cloudfoundry.app.annotations.";

pub const SPACE_NAME: &str = "cloudfoundry.space.name";
pub const SPACE_LABELS_PREFIX: &str = "cloudfoundry.space.labels.";
pub const SPACE_ANNOTATIONS_PREFIX: &str = "cloudfoundry.space.annotations.";

pub const ORG_NAME: &str = "cloudfoundry.org.name";
pub const ORG_LABELS_PREFIX: &str = "cloudfoundry.org.labels.";
pub const ORG_ANNOTATIONS_PREFIX: &str = "cloudfoundry.org.annotations.";
