pub mod error;
pub mod types;

pub use error::ProxyError;
pub use types::{BackendCredentials, QueryOutput, SessionState, StartupParameters, TextRow};

#[cfg(test)]
mod tests;
