use crate::platform::ObjectKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CfEnricherError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not retrieve {kind} with guid {id} from the Cloud Foundry API: {message}")]
    Fetch {
        kind: ObjectKind,
        id: String,
        message: String,
    },

    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("operation canceled")]
    Canceled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CfEnricherError>;
