use thiserror::Error;

/// CLI-level errors: configuration problems plus everything the API
/// client can produce.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("no credentials configured -- set a token, cookies, or username+password")]
    MissingCredentials,

    #[error(transparent)]
    Api(#[from] mobilelink_api::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
