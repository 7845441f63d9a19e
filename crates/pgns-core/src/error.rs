use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("backend connection error: {0}")]
    BackendConnection(String),
    #[error("backend query error: {message}")]
    BackendQuery { code: String, message: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProxyError {
    /// Query failures leave the session usable; everything else ends it.
    pub fn ends_session(&self) -> bool {
        !matches!(self, ProxyError::BackendQuery { .. })
    }

    /// SQLSTATE reported to wire-protocol clients.
    pub fn sqlstate(&self) -> &str {
        match self {
            ProxyError::Transport(_) => "08006",
            ProxyError::Protocol(_) => "08P01",
            ProxyError::BackendConnection(_) => "08001",
            ProxyError::BackendQuery { code, .. } => code,
            ProxyError::Configuration(_) => "F0000",
        }
    }
}
