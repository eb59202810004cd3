use crate::error::{CfEnricherError, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_APP_ID_ATTRIBUTE: &str = "app_id";
pub const DEFAULT_SPACE_ID_ATTRIBUTE: &str = "space_id";

#[derive(Debug, Clone)]
pub struct Settings {
    pub cloud_foundry: CfConfig,
    pub cache: CacheConfig,
    pub extract: ExtractionPolicy,
    pub failure_mode: FailureMode,
}

#[derive(Debug, Clone)]
pub struct CfConfig {
    /// The URL of the CloudFoundry API
    pub endpoint: String,

    /// Authentication details
    pub auth: CfAuth,
}

impl CfConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(CfEnricherError::Config(
                "`endpoint` must be specified".to_string(),
            ));
        }
        self.auth.validate()
    }
}

/// Authentication method, there are 3 options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Username and password
    UserPass,
    /// Client ID and client secret
    ClientCredentials,
    /// Access token and refresh token
    Token,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::UserPass => "user_pass",
            AuthType::ClientCredentials => "client_credentials",
            AuthType::Token => "token",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = CfEnricherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user_pass" => Ok(AuthType::UserPass),
            "client_credentials" => Ok(AuthType::ClientCredentials),
            "token" => Ok(AuthType::Token),
            other => Err(CfEnricherError::Config(format!(
                "configuration option `auth_type` must be set to one of the following values: \
                 [user_pass, client_credentials, token]. Specified value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfAuth {
    pub auth_type: AuthType,

    /// Used for user_pass authentication method
    pub username: String,
    pub password: String,

    /// Used for token authentication method
    pub access_token: String,
    pub refresh_token: String,

    /// Used for client_credentials authentication method
    pub client_id: String,
    pub client_secret: String,
}

impl CfAuth {
    pub fn user_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::UserPass,
            username: username.into(),
            password: password.into(),
            ..Self::empty(AuthType::UserPass)
        }
    }

    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            auth_type: AuthType::ClientCredentials,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::empty(AuthType::ClientCredentials)
        }
    }

    pub fn token(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Token,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            ..Self::empty(AuthType::Token)
        }
    }

    fn empty(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            username: String::new(),
            password: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }

    /// Check that every field the selected scheme needs is present.
    pub fn validate(&self) -> Result<()> {
        match self.auth_type {
            AuthType::UserPass => {
                require_field(&self.username, "username", self.auth_type)?;
                require_field(&self.password, "password", self.auth_type)?;
            }
            AuthType::ClientCredentials => {
                require_field(&self.client_id, "client_id", self.auth_type)?;
                require_field(&self.client_secret, "client_secret", self.auth_type)?;
            }
            AuthType::Token => {
                require_field(&self.access_token, "access_token", self.auth_type)?;
                require_field(&self.refresh_token, "refresh_token", self.auth_type)?;
            }
        }
        Ok(())
    }
}

fn require_field(value: &str, param: &str, auth_type: AuthType) -> Result<()> {
    if value.is_empty() {
        return Err(CfEnricherError::Config(format!(
            "{param} is required when using auth_type: {auth_type}"
        )));
    }
    Ok(())
}

/// Declarative toggles controlling which metadata classes are written
/// onto a resource, plus the identity attribute keys to look for.
#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    /// Write app labels and annotations. Default: true
    pub include_app_metadata: bool,

    /// Resolve the owning space and write its name, labels and
    /// annotations. Default: false
    pub include_space_metadata: bool,

    /// Resolve the owning organization and write its name, labels and
    /// annotations. Organizations are reached through spaces, so this
    /// only takes effect together with `include_space_metadata`.
    /// Default: false
    pub include_org_metadata: bool,

    /// Write app state, lifecycle type, stack and buildpacks.
    /// Default: false
    pub app_state_lifecycle: bool,

    /// Write app created/updated timestamps. Default: false
    pub app_dates: bool,

    /// Resource attribute naming the application id. Default: "app_id"
    pub app_id_attribute: String,

    /// Resource attribute naming the space id. Default: "space_id"
    pub space_id_attribute: String,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            include_app_metadata: true,
            include_space_metadata: false,
            include_org_metadata: false,
            app_state_lifecycle: false,
            app_dates: false,
            app_id_attribute: DEFAULT_APP_ID_ATTRIBUTE.to_string(),
            space_id_attribute: DEFAULT_SPACE_ID_ATTRIBUTE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// How long a cached platform object stays fresh. Default: 10m
    pub ttl: Duration,

    /// Interval between cleanup sweeps reclaiming expired entries.
    /// Should be shorter than the TTL. Default: 1m
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// What happens to a batch when one resource's lookup fails.
///
/// `AbortBatch` fails the whole batch on the first error, which matches
/// the processor's historical behavior. `SkipResource` logs the failure
/// and continues with the remaining resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    AbortBatch,
    SkipResource,
}

impl FromStr for FailureMode {
    type Err = CfEnricherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort_batch" => Ok(FailureMode::AbortBatch),
            "skip_resource" => Ok(FailureMode::SkipResource),
            other => Err(CfEnricherError::Config(format!(
                "configuration option `failure_mode` must be set to one of the following values: \
                 [abort_batch, skip_resource]. Specified value: {other}"
            ))),
        }
    }
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let auth_type: AuthType = std::env::var("CF_AUTH_TYPE")
        .map_err(|_| CfEnricherError::Config("CF_AUTH_TYPE not set".to_string()))?
        .parse()?;

    let auth = CfAuth {
        auth_type,
        username: env_or_empty("CF_USERNAME"),
        password: env_or_empty("CF_PASSWORD"),
        access_token: env_or_empty("CF_ACCESS_TOKEN"),
        refresh_token: env_or_empty("CF_REFRESH_TOKEN"),
        client_id: env_or_empty("CF_CLIENT_ID"),
        client_secret: env_or_empty("CF_CLIENT_SECRET"),
    };

    let cloud_foundry = CfConfig {
        endpoint: std::env::var("CF_API_ENDPOINT")
            .map_err(|_| CfEnricherError::Config("CF_API_ENDPOINT not set".to_string()))?,
        auth,
    };
    cloud_foundry.validate()?;

    let cache = CacheConfig {
        ttl: Duration::from_secs(env_parse("CF_CACHE_TTL_SECS", 600)?),
        cleanup_interval: Duration::from_secs(env_parse("CF_CACHE_CLEANUP_INTERVAL_SECS", 60)?),
    };

    let extract = ExtractionPolicy {
        include_app_metadata: env_parse("CF_INCLUDE_APP_METADATA", true)?,
        include_space_metadata: env_parse("CF_INCLUDE_SPACE_METADATA", false)?,
        include_org_metadata: env_parse("CF_INCLUDE_ORG_METADATA", false)?,
        app_state_lifecycle: env_parse("CF_APP_STATE_LIFECYCLE", false)?,
        app_dates: env_parse("CF_APP_DATES", false)?,
        app_id_attribute: std::env::var("CF_APPID_ATTRIBUTE")
            .unwrap_or_else(|_| DEFAULT_APP_ID_ATTRIBUTE.to_string()),
        space_id_attribute: std::env::var("CF_SPACEID_ATTRIBUTE")
            .unwrap_or_else(|_| DEFAULT_SPACE_ID_ATTRIBUTE.to_string()),
    };

    if extract.include_org_metadata && !extract.include_space_metadata {
        tracing::warn!(
            "include_org_metadata has no effect without include_space_metadata; \
             organizations are reached through spaces"
        );
    }

    let failure_mode = match std::env::var("CF_FAILURE_MODE") {
        Ok(value) => value.parse()?,
        Err(_) => FailureMode::default(),
    };

    Ok(Settings {
        cloud_foundry,
        cache,
        extract,
        failure_mode,
    })
}

fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| CfEnricherError::Config(format!("Invalid {name}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_config_err(result: Result<()>, needle: &str) {
        match result {
            Err(CfEnricherError::Config(msg)) => {
                assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_user_pass_requires_password() {
        let mut auth = CfAuth::user_password("admin", "secret");
        assert!(auth.validate().is_ok());

        auth.password.clear();
        assert_config_err(
            auth.validate(),
            "password is required when using auth_type: user_pass",
        );
    }

    #[test]
    fn test_client_credentials_requires_both_fields() {
        let auth = CfAuth::client_credentials("", "s3cr3t");
        assert_config_err(
            auth.validate(),
            "client_id is required when using auth_type: client_credentials",
        );

        let auth = CfAuth::client_credentials("my-client", "");
        assert_config_err(
            auth.validate(),
            "client_secret is required when using auth_type: client_credentials",
        );
    }

    #[test]
    fn test_token_requires_refresh_token() {
        let auth = CfAuth::token("access", "");
        assert_config_err(
            auth.validate(),
            "refresh_token is required when using auth_type: token",
        );
    }

    #[test]
    fn test_auth_type_from_str_rejects_unknown() {
        let err = "basic".parse::<AuthType>().unwrap_err();
        assert!(err.to_string().contains("[user_pass, client_credentials, token]"));
        assert!(err.to_string().contains("basic"));

        assert_eq!("token".parse::<AuthType>().unwrap(), AuthType::Token);
    }

    #[test]
    fn test_endpoint_must_be_set() {
        let config = CfConfig {
            endpoint: String::new(),
            auth: CfAuth::user_password("admin", "secret"),
        };
        assert_config_err(config.validate(), "`endpoint` must be specified");
    }

    #[test]
    fn test_extraction_policy_defaults() {
        let policy = ExtractionPolicy::default();
        assert!(policy.include_app_metadata);
        assert!(!policy.include_space_metadata);
        assert!(!policy.include_org_metadata);
        assert!(!policy.app_state_lifecycle);
        assert!(!policy.app_dates);
        assert_eq!(policy.app_id_attribute, "app_id");
        assert_eq!(policy.space_id_attribute, "space_id");
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.ttl, Duration::from_secs(600));
        assert_eq!(cache.cleanup_interval, Duration::from_secs(60));
        assert!(cache.cleanup_interval < cache.ttl);
    }

    #[test]
    fn test_failure_mode_from_str() {
        assert_eq!(
            "skip_resource".parse::<FailureMode>().unwrap(),
            FailureMode::SkipResource
        );
        assert!("explode".parse::<FailureMode>().is_err());
        assert_eq!(FailureMode::default(), FailureMode::AbortBatch);
    }
}
