use crate::config::{Config, ResultFormat};
use crate::connector::{BackendConnector, PgConnector};
use crate::handshake;
use crate::session::ProxySession;
use anyhow::Context;
use metrics::counter;
use pgns_core::{ProxyError, SessionState};
use pgns_protocol::backend::write_message;
use pgns_protocol::messages::BackendMessage;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen_addr))?;
    info!(
        listen_addr = %config.listen_addr,
        backend = %format!("{}:{}", config.target_host, config.target_port),
        "pgns listening"
    );

    let limiter = Arc::new(Semaphore::new(config.connection_pool_size));
    let config = Arc::new(config);
    let connector = Arc::new(PgConnector);
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                error!("failed to accept connection: {err}");
                continue;
            }
        };
        let _ = socket.set_nodelay(true);
        let config = config.clone();
        let connector = connector.clone();
        let limiter = limiter.clone();
        let span = info_span!("session", %peer, id = %Uuid::new_v4());
        tokio::spawn(
            async move {
                match handle_client(socket, &config, connector.as_ref(), &limiter).await {
                    Ok(()) => info!("session ended"),
                    Err(err) => {
                        counter!("pgns_session_errors_total").increment(1);
                        error!("session error: {err}");
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Serves one accepted connection from handshake to teardown.
pub async fn handle_client<S, C>(
    mut stream: S,
    config: &Config,
    connector: &C,
    limiter: &Semaphore,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    C: BackendConnector,
{
    counter!("pgns_sessions_total").increment(1);
    debug!(state = %SessionState::Handshaking, "client connected");
    let Some(handshake) = handshake::perform(&mut stream, config).await? else {
        return Ok(());
    };
    info!(
        user = %handshake.credentials.user,
        database = %handshake.credentials.database,
        namespace = %handshake.namespace,
        application_name = handshake.params.application_name().unwrap_or_default(),
        "client authenticated"
    );

    let _permit = limiter
        .acquire()
        .await
        .map_err(|_| ProxyError::BackendConnection("backend session limit closed".into()))?;
    let backend = match connector.connect(&handshake.credentials).await {
        Ok(backend) => backend,
        Err(err) => {
            if config.result_format == ResultFormat::Wire {
                let _ = write_message(&mut stream, BackendMessage::fatal(err.sqlstate(), err.to_string())).await;
            }
            return Err(err);
        }
    };
    if config.result_format == ResultFormat::Wire {
        handshake::complete(&mut stream).await?;
    }

    ProxySession::new(stream, backend, handshake.namespace, config.result_format)
        .run()
        .await
}
