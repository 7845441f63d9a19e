use pgns_core::StartupParameters;

/// Protocol 3.0, encoded as `major << 16 | minor`.
pub const PROTOCOL_VERSION_3: i32 = 196608;
pub const CANCEL_REQUEST_CODE: i32 = 80877102;
pub const SSL_REQUEST_CODE: i32 = 80877103;
pub const GSSENC_REQUEST_CODE: i32 = 80877104;

/// Upper bound for a startup packet, matching the server's own limit.
pub const MAX_STARTUP_LEN: usize = 10_000;
/// Upper bound for any regular frontend message.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// First packet of a connection, classified by its protocol version field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupRequest {
    Startup { params: StartupParameters },
    CancelRequest { pid: i32, secret: i32 },
    SslRequest,
    GssEncRequest,
    UnsupportedVersion { version: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendMessage {
    Query { sql: String },
    Password { password: String },
    Terminate,
    Unsupported { code: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InTransaction,
    Failed,
}

impl TransactionStatus {
    pub fn wire_byte(self) -> u8 {
        match self {
            TransactionStatus::Idle => b'I',
            TransactionStatus::InTransaction => b'T',
            TransactionStatus::Failed => b'E',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// Single `N` byte answering an SSL or GSSAPI encryption request.
    EncryptionRefused,
    AuthenticationOk,
    AuthenticationCleartextPassword,
    ParameterStatus { key: String, value: String },
    ReadyForQuery { status: TransactionStatus },
    RowDescription { fields: Vec<String> },
    DataRow { values: Vec<Option<Vec<u8>>> },
    CommandComplete { tag: String },
    EmptyQueryResponse,
    ErrorResponse {
        severity: String,
        code: String,
        message: String,
    },
}

impl BackendMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        BackendMessage::ErrorResponse {
            severity: "ERROR".into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn fatal(code: &str, message: impl Into<String>) -> Self {
        BackendMessage::ErrorResponse {
            severity: "FATAL".into(),
            code: code.into(),
            message: message.into(),
        }
    }
}
