mod settings;

pub use settings::{
    AuthType, CacheConfig, CfAuth, CfConfig, ExtractionPolicy, FailureMode, Settings,
    load_settings,
};
