use crate::config::ResultFormat;
use crate::connector::BackendSession;
use metrics::counter;
use pgns_core::{ProxyError, QueryOutput, SessionState};
use pgns_protocol::backend::write_message;
use pgns_protocol::frontend::read_message;
use pgns_protocol::messages::{BackendMessage, FrontendMessage, TransactionStatus};
use pgns_rewrite::{add_namespace, Namespace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Size of a single client read in text mode; each read is one query.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Mediation between one authenticated client and its backend session.
/// Only constructible with an open backend, so it starts `Authenticated`.
pub struct ProxySession<S, B> {
    client: S,
    backend: B,
    namespace: Namespace,
    format: ResultFormat,
    state: SessionState,
    status: TransactionStatus,
}

impl<S, B> ProxySession<S, B>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    B: BackendSession,
{
    pub fn new(client: S, backend: B, namespace: Namespace, format: ResultFormat) -> Self {
        Self {
            client,
            backend,
            namespace,
            format,
            state: SessionState::Authenticated,
            status: TransactionStatus::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Proxies until the client goes away, then closes both ends. EOF is a
    /// normal termination; read and write failures are returned.
    pub async fn run(mut self) -> Result<(), ProxyError> {
        self.state = SessionState::Proxying;
        debug!(state = %self.state, namespace = %self.namespace, "session proxying");
        let result = match self.format {
            ResultFormat::Text => self.proxy_text().await,
            ResultFormat::Wire => self.proxy_wire().await,
        };
        self.close().await;
        result
    }

    async fn close(&mut self) {
        self.state = SessionState::Closed;
        let _ = self.client.shutdown().await;
        self.backend.close().await;
        debug!(state = %self.state(), "session closed");
    }

    async fn proxy_text(&mut self) -> Result<(), ProxyError> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = self.client.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            let query = String::from_utf8_lossy(&buf[..n]).into_owned();
            let outputs = match self.execute(&query).await {
                Ok(outputs) => outputs,
                Err(err) if !err.ends_session() => continue,
                Err(err) => return Err(err),
            };
            for row in outputs.into_iter().flat_map(|output| output.rows) {
                let line = format!("{}\n", row.render());
                self.client.write_all(line.as_bytes()).await?;
            }
            self.client.flush().await?;
        }
    }

    async fn proxy_wire(&mut self) -> Result<(), ProxyError> {
        loop {
            match read_message(&mut self.client).await? {
                FrontendMessage::Query { sql } => {
                    if sql.trim().is_empty() {
                        write_message(&mut self.client, BackendMessage::EmptyQueryResponse).await?;
                    } else {
                        match self.execute(&sql).await {
                            Ok(outputs) => {
                                for output in outputs {
                                    self.track_status(&output.tag);
                                    self.write_output(output).await?;
                                }
                            }
                            Err(err) if !err.ends_session() => {
                                if self.status == TransactionStatus::InTransaction {
                                    self.status = TransactionStatus::Failed;
                                }
                                let msg = BackendMessage::error(err.sqlstate(), err.to_string());
                                write_message(&mut self.client, msg).await?;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    self.ready_for_query().await?;
                }
                FrontendMessage::Terminate => return Ok(()),
                FrontendMessage::Password { .. } => {
                    self.reject("unexpected password message").await?;
                }
                FrontendMessage::Unsupported { code } => {
                    let reason = format!("unsupported message: {}", code as char);
                    self.reject(&reason).await?;
                }
            }
        }
    }

    /// Rewrites and runs one query. Backend failures are logged here.
    async fn execute(&mut self, query: &str) -> Result<Vec<QueryOutput>, ProxyError> {
        counter!("pgns_queries_total").increment(1);
        let rewritten = add_namespace(query, &self.namespace);
        debug!(query = %rewritten, "forwarding query");
        let result = self.backend.simple_query(&rewritten).await;
        if let Err(err) = &result {
            counter!("pgns_query_errors_total").increment(1);
            warn!(error = %err, "error executing query on backend");
        }
        result
    }

    async fn write_output(&mut self, output: QueryOutput) -> Result<(), ProxyError> {
        if !output.columns.is_empty() {
            write_message(
                &mut self.client,
                BackendMessage::RowDescription {
                    fields: output.columns,
                },
            )
            .await?;
            for row in output.rows {
                let values = row.values.into_iter().map(|v| v.map(String::into_bytes)).collect();
                write_message(&mut self.client, BackendMessage::DataRow { values }).await?;
            }
        }
        write_message(&mut self.client, BackendMessage::CommandComplete { tag: output.tag }).await
    }

    async fn reject(&mut self, reason: &str) -> Result<(), ProxyError> {
        write_message(&mut self.client, BackendMessage::error("0A000", reason)).await?;
        self.ready_for_query().await
    }

    async fn ready_for_query(&mut self) -> Result<(), ProxyError> {
        let status = self.status;
        write_message(&mut self.client, BackendMessage::ReadyForQuery { status }).await
    }

    fn track_status(&mut self, tag: &str) {
        self.status = match tag {
            "BEGIN" | "START" => TransactionStatus::InTransaction,
            "COMMIT" | "ROLLBACK" | "END" | "ABORT" => TransactionStatus::Idle,
            _ => self.status,
        };
    }
}
