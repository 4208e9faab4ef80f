use crate::config::TrackerConfig;
use crate::gateway::{GatewayError, HttpGateway, OrderGateway};
use crate::model::{CreateOrder, OrderId, ProductId, UserId};
use crate::session::{
    open_checkout, open_tracking, SessionClient, SessionError, SessionEvent, SessionHandle,
    SessionId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info};

/// Owns the gateway, the configuration and every open tracking session.
///
/// A session stays registered, and its task stays alive, after it settles. Hosts release it with
/// [`close`](Self::close) once its view is gone, or all at once with [`shutdown`](Self::shutdown).
///
/// # Example
///
/// ```ignore
/// let system = TrackerSystem::connect(load_config()?)?;
///
/// let session = system.checkout("1".into(), "7".into(), 2).await;
/// let settled = session.wait_settled().await?;
///
/// system.shutdown().await?;
/// ```
pub struct TrackerSystem {
    gateway: Arc<dyn OrderGateway>,
    config: TrackerConfig,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    next_id: AtomicU64,
}

impl TrackerSystem {
    pub fn new(gateway: Arc<dyn OrderGateway>, config: TrackerConfig) -> Self {
        Self {
            gateway,
            config,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Builds a system backed by the HTTP gateway described in `config`.
    pub fn connect(config: TrackerConfig) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&config.gateway)?;
        Ok(Self::new(Arc::new(gateway), config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn next_session_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, handle: SessionHandle) -> SessionClient {
        let client = handle.client().clone();
        self.sessions().insert(handle.id(), handle);
        client
    }

    /// Places a single-product order and starts tracking it. The session stays registered until
    /// closed.
    pub async fn checkout(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> SessionClient {
        let id = self.next_session_id();
        let request = CreateOrder::single(user_id, product_id, quantity);
        let handle = open_checkout(id, self.gateway.clone(), &self.config, request).await;
        self.register(handle)
    }

    /// Opens a tracking view for an order that already exists.
    pub fn track(&self, user_id: UserId, order_id: OrderId) -> SessionClient {
        let id = self.next_session_id();
        let handle = open_tracking(id, self.gateway.clone(), &self.config, user_id, order_id);
        self.register(handle)
    }

    pub fn session(&self, id: SessionId) -> Option<SessionClient> {
        self.sessions().get(&id).map(|h| h.client().clone())
    }

    /// The session's event stream from its first event on. Returns `None` if the session is unknown
    /// or the stream was already taken.
    pub fn take_events(&self, id: SessionId) -> Option<broadcast::Receiver<SessionEvent>> {
        self.sessions().get_mut(&id)?.take_events()
    }

    /// Registered sessions, settled or not.
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Tears down one session. Its timer is released before this returns.
    pub async fn close(&self, id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .sessions()
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        handle.teardown().await?;
        info!(session_id = %id, "Session closed");
        Ok(())
    }

    /// Tears down every session and waits for all of them to exit.
    pub async fn shutdown(self) -> Result<(), SessionError> {
        info!("Shutting down tracker...");

        let handles: Vec<SessionHandle> = self
            .sessions
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_values()
            .collect();

        let mut result = Ok(());
        for handle in handles {
            let id = handle.id();
            if let Err(e) = handle.teardown().await {
                error!(session_id = %id, error = %e, "Session task failed");
                result = Err(e);
            }
        }

        info!("Tracker shutdown complete.");
        result
    }
}
