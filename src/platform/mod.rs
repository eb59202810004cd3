//! Cloud Foundry platform objects and the authenticated API facade

mod client;
mod types;

pub use client::{PlatformApi, PlatformClient};
pub use types::{Application, ObjectKind, Organization, PlatformObject, Space};
