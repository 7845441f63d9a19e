use pgns_core::StartupParameters;
use std::fmt;

pub const DEFAULT_NAMESPACE: &str = "public";
const NAMESPACE_PREFIX: &str = "namespace:";

/// Schema that a session's queries are confined to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives the namespace from `application_name`. Accepts either the bare
    /// schema name or `namespace:<schema>`; a missing or empty value falls
    /// back to `default`.
    pub fn from_application_name(application_name: Option<&str>, default: &str) -> Self {
        let name = application_name
            .map(|app| app.strip_prefix(NAMESPACE_PREFIX).unwrap_or(app))
            .filter(|name| !name.is_empty())
            .unwrap_or(default);
        Self::new(name)
    }

    pub fn from_startup(params: &StartupParameters, default: &str) -> Self {
        Self::from_application_name(params.application_name(), default)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
