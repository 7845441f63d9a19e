use crate::replies::{collect_results, ReplyEvent};
use async_trait::async_trait;
use pgns_core::{BackendCredentials, ProxyError, QueryOutput, TextRow};
use tokio::task::JoinHandle;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::{debug, warn};

/// An open session on the backend database, able to run simple queries.
#[async_trait]
pub trait BackendSession: Send {
    /// Runs a simple query and returns one result per statement it contained.
    async fn simple_query(&mut self, sql: &str) -> Result<Vec<QueryOutput>, ProxyError>;

    async fn close(&mut self);
}

/// Opens one fresh backend session per client session.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    type Session: BackendSession;

    async fn connect(&self, credentials: &BackendCredentials) -> Result<Self::Session, ProxyError>;
}

#[derive(Debug, Clone, Default)]
pub struct PgConnector;

#[async_trait]
impl BackendConnector for PgConnector {
    type Session = PgSession;

    async fn connect(&self, credentials: &BackendCredentials) -> Result<PgSession, ProxyError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&credentials.host)
            .port(credentials.port)
            .user(&credentials.user)
            .password(&credentials.password)
            .dbname(&credentials.database)
            .application_name("pgns");
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|err| ProxyError::BackendConnection(describe_error(&err)))?;
        let connection = tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!(error = %err, "backend connection ended with error");
            }
        });
        debug!(backend = %credentials.display_string(), "backend session opened");
        Ok(PgSession {
            client: Some(client),
            connection,
        })
    }
}

pub struct PgSession {
    client: Option<tokio_postgres::Client>,
    connection: JoinHandle<()>,
}

#[async_trait]
impl BackendSession for PgSession {
    async fn simple_query(&mut self, sql: &str) -> Result<Vec<QueryOutput>, ProxyError> {
        let client = self.client.as_ref().ok_or_else(|| ProxyError::BackendQuery {
            code: "08003".into(),
            message: "backend session is closed".into(),
        })?;
        let messages = client.simple_query(sql).await.map_err(query_error)?;
        let mut events = Vec::with_capacity(messages.len());
        let mut described = false;
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    described = true;
                    events.push(ReplyEvent::Columns(
                        columns.iter().map(|c| c.name().to_string()).collect(),
                    ));
                }
                SimpleQueryMessage::Row(row) => {
                    if !described {
                        described = true;
                        events.push(ReplyEvent::Columns(
                            row.columns().iter().map(|c| c.name().to_string()).collect(),
                        ));
                    }
                    let values = (0..row.len()).map(|idx| row.get(idx).map(str::to_string)).collect();
                    events.push(ReplyEvent::Row(TextRow::new(values)));
                }
                SimpleQueryMessage::CommandComplete(count) => {
                    described = false;
                    events.push(ReplyEvent::Complete(count));
                }
                _ => {}
            }
        }
        Ok(collect_results(sql, events))
    }

    async fn close(&mut self) {
        // Dropping the client makes the connection task send Terminate and exit.
        if self.client.take().is_some() {
            let _ = (&mut self.connection).await;
        }
    }
}

fn query_error(err: tokio_postgres::Error) -> ProxyError {
    let code = err
        .as_db_error()
        .map(|db| db.code().code().to_string())
        .unwrap_or_else(|| "XX000".to_string());
    ProxyError::BackendQuery {
        code,
        message: describe_error(&err),
    }
}

fn describe_error(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{}: {}", db.severity(), db.message()),
        None => err.to_string(),
    }
}
