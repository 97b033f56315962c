//! JSON-RPC connection over a [`Transport`].
//!
//! Each connection owns one background task that reads frames for the
//! connection's whole lifetime. Responses are routed to waiting callers,
//! notifications go to a [`NotificationHandler`], and requests from the
//! server are answered with a null result.
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::error::LspError;
use crate::framing::{read_frame, write_frame};
use crate::lock;
use crate::protocol::{
    decode_message, encode_null_response, ClientNotification, ClientRequest, ServerMessage,
    ServerNotification,
};
use crate::transport::Transport;

/// Receives notifications decoded by the reading task.
///
/// Called on the reading task with no connection locks held.
pub trait NotificationHandler: Send + Sync {
    /// Handle one notification.
    fn handle_notification(&self, notification: ServerNotification);
}

/// A bidirectional JSON-RPC connection.
pub struct RpcConnection {
    transport: Arc<Transport>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    next_id: AtomicI64,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl RpcConnection {
    /// Start a connection and its reading task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: Transport, handler: Arc<dyn NotificationHandler>) -> Self {
        let transport = Arc::new(transport);
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new()));
        let reader_task = tokio::spawn(read_loop(
            Arc::clone(&transport),
            Arc::clone(&dispatcher),
            handler,
        ));
        Self {
            transport,
            dispatcher,
            next_id: AtomicI64::new(1),
            reader_task: Mutex::new(Some(reader_task)),
        }
    }

    /// Send a request and wait for its response with no deadline.
    pub async fn call(&self, request: ClientRequest) -> Result<Value, LspError> {
        self.call_with_timeout(request, None).await
    }

    /// Send a request and wait for its response.
    ///
    /// With `deadline` set, the pending call is dropped and `Timeout` is
    /// returned once it elapses. If the connection closes first the call
    /// fails with `Transport`.
    pub async fn call_with_timeout(
        &self,
        request: ClientRequest,
        deadline: Option<Duration>,
    ) -> Result<Value, LspError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request.encode(id)?;
        let rx = lock(&self.dispatcher).register(id)?;

        debug!(id, method = request.method(), "sending request");
        if let Err(e) = write_frame(&self.transport, &body).await {
            lock(&self.dispatcher).remove(id);
            return Err(e);
        }

        let received = match deadline {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    lock(&self.dispatcher).remove(id);
                    warn!(id, method = request.method(), "request timed out");
                    return Err(LspError::Timeout(limit));
                }
            },
            None => rx.await,
        };
        received.map_err(|_| LspError::Transport("connection closed before response".into()))?
    }

    /// Send a notification. Write failures are returned to the caller.
    pub async fn notify(&self, notification: ClientNotification) -> Result<(), LspError> {
        let body = notification.encode()?;
        debug!(method = notification.method(), "sending notification");
        write_frame(&self.transport, &body).await
    }

    /// Stop the reading task, close the transport, and fail every
    /// outstanding call.
    ///
    /// Safe to call more than once.
    pub async fn close(&self) -> Result<(), LspError> {
        let task = lock(&self.reader_task).take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        let result = self.transport.close().await;
        lock(&self.dispatcher).fail_all("connection closed");
        result
    }

    /// Whether the connection was closed locally or by the server.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed() || lock(&self.dispatcher).is_closed()
    }

    /// Number of calls awaiting a response.
    pub fn pending_calls(&self) -> usize {
        lock(&self.dispatcher).pending_count()
    }
}

impl Drop for RpcConnection {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.reader_task).take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for RpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConnection")
            .field("closed", &self.is_closed())
            .field("pending_calls", &self.pending_calls())
            .finish()
    }
}

/// Fails every pending call when the reading task ends, including by
/// panic or abort.
struct FailPendingOnExit(Arc<Mutex<Dispatcher>>);

impl Drop for FailPendingOnExit {
    fn drop(&mut self) {
        lock(&self.0).fail_all("server closed the connection");
    }
}

async fn read_loop(
    transport: Arc<Transport>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    handler: Arc<dyn NotificationHandler>,
) {
    let _exit = FailPendingOnExit(Arc::clone(&dispatcher));
    loop {
        let body = match read_frame(&transport).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("server closed its output");
                break;
            }
            Err(e) if e.is_protocol() => {
                warn!(error = %e, "dropping malformed frame");
                continue;
            }
            Err(e) => {
                debug!(error = %e, "read failed");
                break;
            }
        };

        match decode_message(&body) {
            Ok(ServerMessage::Response { id, outcome }) => {
                if !lock(&dispatcher).resolve(id, outcome) {
                    warn!(id, "response for unknown request id");
                }
            }
            Ok(ServerMessage::Notification(notification)) => {
                handler.handle_notification(notification);
            }
            Ok(ServerMessage::Request { id, method }) => {
                debug!(%method, "answering server request with null");
                if let Err(e) = write_frame(&transport, &encode_null_response(&id)).await {
                    warn!(%method, error = %e, "failed to reply to server request");
                }
            }
            Err(LspError::UnsupportedMethod(method)) => {
                debug!(%method, "ignoring unsupported notification");
            }
            Err(e) => warn!(error = %e, "dropping malformed message"),
        }
    }
}
