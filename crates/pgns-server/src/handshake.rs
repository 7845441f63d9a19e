use crate::config::Config;
use pgns_core::{BackendCredentials, ProxyError, StartupParameters};
use pgns_protocol::backend::write_message;
use pgns_protocol::frontend::{read_password, read_startup};
use pgns_protocol::messages::{BackendMessage, StartupRequest, TransactionStatus};
use pgns_rewrite::Namespace;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Outcome of a completed client handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub params: StartupParameters,
    pub namespace: Namespace,
    pub credentials: BackendCredentials,
}

/// Runs the server side of startup and cleartext password authentication.
/// One pass, no retries: any failure ends the connection. `None` means the
/// client only sent a cancel request.
pub async fn perform<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    config: &Config,
) -> Result<Option<Handshake>, ProxyError> {
    let Some(params) = negotiate_startup(stream).await? else {
        return Ok(None);
    };
    for (key, value) in params.iter() {
        debug!(key, value, "startup parameter");
    }
    let Some(user) = params.user().map(str::to_string) else {
        let _ = write_message(
            stream,
            BackendMessage::fatal("28000", "no PostgreSQL user name specified in startup packet"),
        )
        .await;
        return Err(ProxyError::Protocol("startup message has no user".into()));
    };

    write_message(stream, BackendMessage::AuthenticationCleartextPassword).await?;
    let password = read_password(stream).await?;

    let database = params.database().map(str::to_string).unwrap_or_else(|| user.clone());
    let credentials = BackendCredentials {
        host: config.target_host.clone(),
        port: config.target_port,
        user,
        password,
        database,
    };
    let namespace = Namespace::from_startup(&params, &config.default_namespace);
    Ok(Some(Handshake {
        params,
        namespace,
        credentials,
    }))
}

/// Reads startup packets until a protocol 3.0 one arrives. A single SSL or
/// GSSAPI encryption request is refused with `N`, after which the client
/// retries in cleartext. Unknown versions are rejected. Cancel requests
/// yield `None`; no backend key data is ever issued, so none can match.
async fn negotiate_startup<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
) -> Result<Option<StartupParameters>, ProxyError> {
    let mut refused = false;
    loop {
        match read_startup(stream).await? {
            StartupRequest::Startup { params } => return Ok(Some(params)),
            StartupRequest::CancelRequest { pid, .. } => {
                debug!(pid, "ignoring cancel request");
                return Ok(None);
            }
            StartupRequest::SslRequest | StartupRequest::GssEncRequest if !refused => {
                write_message(stream, BackendMessage::EncryptionRefused).await?;
                refused = true;
            }
            StartupRequest::SslRequest | StartupRequest::GssEncRequest => {
                return Err(ProxyError::Protocol("repeated encryption request".into()));
            }
            StartupRequest::UnsupportedVersion { version } => {
                let message = format!(
                    "unsupported frontend protocol {}.{}: server supports 3.0",
                    version >> 16,
                    version & 0xffff
                );
                let _ = write_message(stream, BackendMessage::fatal("0A000", message.clone())).await;
                return Err(ProxyError::Protocol(message));
            }
        }
    }
}

/// Finishes authentication for wire-mode clients once the backend accepted
/// the credentials.
pub async fn complete<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<(), ProxyError> {
    write_message(stream, BackendMessage::AuthenticationOk).await?;
    for (key, value) in [("server_version", "14.0"), ("client_encoding", "UTF8")] {
        write_message(
            stream,
            BackendMessage::ParameterStatus {
                key: key.into(),
                value: value.into(),
            },
        )
        .await?;
    }
    write_message(
        stream,
        BackendMessage::ReadyForQuery {
            status: TransactionStatus::Idle,
        },
    )
    .await
}
