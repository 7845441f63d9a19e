use std::collections::HashMap;
use std::fmt;

pub const USER: &str = "user";
pub const DATABASE: &str = "database";
pub const APPLICATION_NAME: &str = "application_name";

/// Parameters sent by the client in its startup message. Keys are kept
/// exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupParameters {
    params: HashMap<String, String>,
}

impl StartupParameters {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.get(USER)
    }

    pub fn database(&self) -> Option<&str> {
        self.get(DATABASE)
    }

    pub fn application_name(&self) -> Option<&str> {
        self.get(APPLICATION_NAME)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for StartupParameters {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}

impl FromIterator<(String, String)> for StartupParameters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl BackendCredentials {
    pub fn display_string(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// Lifecycle of a single client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Authenticated,
    Proxying,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Handshaking => "handshaking",
            SessionState::Authenticated => "authenticated",
            SessionState::Proxying => "proxying",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One result row in text form. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    pub values: Vec<Option<String>>,
}

impl TextRow {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Human-readable rendering used by the text reply mode, e.g. `[1 alice NULL]`.
    pub fn render(&self) -> String {
        let cells: Vec<&str> = self
            .values
            .iter()
            .map(|v| v.as_deref().unwrap_or("NULL"))
            .collect();
        format!("[{}]", cells.join(" "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<TextRow>,
    pub tag: String,
}
