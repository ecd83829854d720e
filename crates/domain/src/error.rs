/// Shared error type used across all agentstack crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("env file {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("missing required key {key} in {path}")]
    MissingEnvKey { path: String, key: String },

    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("expected containers not running: {}", .0.join(", "))]
    ContainersMissing(Vec<String>),

    #[error("{name} not reachable at {host}:{port} within {timeout_secs}s")]
    NotReady {
        name: String,
        host: String,
        port: u16,
        timeout_secs: u64,
    },

    #[error("database: {0}")]
    Database(String),

    #[error("migration V{version} ({name}): {message}")]
    Migration {
        version: u32,
        name: String,
        message: String,
    },

    #[error("unknown placeholder {{{{{0}}}}}")]
    UnknownPlaceholder(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("stage: {0}")]
    Stage(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the API reported the endpoint as absent (404 / 405).
    pub fn is_missing_endpoint(&self) -> bool {
        matches!(self, Error::Api { status: 404 | 405, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
