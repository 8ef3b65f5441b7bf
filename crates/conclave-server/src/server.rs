use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use conclave_cache::{InMemoryCache, KeyValueCache};
use conclave_core::{Conclave, LogMailer, Mailer};
use conclave_store::{EntityStore, InMemoryEntityStore};
use conclave_tasks::{InMemoryTaskQueue, TaskReceiver};

use crate::auth::{HeaderIdentity, IdentityProvider};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Conclave HTTP server with its background task worker.
pub struct ConclaveServer {
    config: ServerConfig,
    state: AppState,
    receiver: TaskReceiver,
}

impl ConclaveServer {
    /// A server over in-process backends that logs outgoing mail.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(InMemoryEntityStore::new()),
            Arc::new(InMemoryCache::new()),
            Arc::new(LogMailer),
            Arc::new(HeaderIdentity::default()),
        )
    }

    pub fn with_backends(
        config: ServerConfig,
        store: Arc<dyn EntityStore>,
        cache: Arc<dyn KeyValueCache>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (queue, receiver) = InMemoryTaskQueue::new(config.task_channel_capacity);
        let tasks = Arc::new(queue);
        let app = Conclave::new(store, cache, tasks.clone(), mailer, config.settings());
        Self {
            state: AppState::new(Arc::new(app), identity, tasks),
            config,
            receiver,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start the task worker and serve requests until the listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        self.config.validate()?;
        let worker = self.state.app.worker(self.receiver);
        tokio::spawn(worker.run());

        let app = build_router(self.state);
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Conclave server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for ConclaveServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConclaveServer")
            .field("bind_addr", &self.config.bind_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = ConclaveServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(format!("{server:?}").contains("127.0.0.1:8080"));
    }

    #[test]
    fn router_builds() {
        let server = ConclaveServer::new(ServerConfig::default());
        let _router = server.router();
    }

    #[tokio::test]
    async fn serve_rejects_invalid_config() {
        let config = ServerConfig {
            transaction_attempts: 0,
            ..Default::default()
        };
        let result = ConclaveServer::new(config).serve().await;
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
