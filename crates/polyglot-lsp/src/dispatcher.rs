//! Pending-call table.
//!
//! Tracks outstanding requests by id and routes each response to the
//! caller waiting on it through a oneshot channel.
use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::LspError;
use crate::protocol::RpcError;

/// What a waiting caller receives.
pub type CallResult = Result<Value, LspError>;

/// Outstanding requests of one connection.
#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: HashMap<i64, oneshot::Sender<CallResult>>,
    closed: bool,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending call and return the receiver for its result.
    ///
    /// Fails once the connection has been closed.
    pub fn register(&mut self, id: i64) -> Result<oneshot::Receiver<CallResult>, LspError> {
        if self.closed {
            return Err(LspError::Transport("connection closed".into()));
        }
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        Ok(rx)
    }

    /// Deliver a response. Returns false if no call is waiting on `id`.
    pub fn resolve(&mut self, id: i64, outcome: Result<Value, RpcError>) -> bool {
        match self.pending.remove(&id) {
            Some(sender) => {
                // The caller may have given up; nothing to do then.
                let _ = sender.send(outcome.map_err(LspError::from));
                true
            }
            None => false,
        }
    }

    /// Forget a pending call. Returns true if it was registered.
    pub fn remove(&mut self, id: i64) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Fail every pending call with a transport error and refuse new ones.
    pub fn fail_all(&mut self, reason: &str) {
        self.closed = true;
        for (_, sender) in self.pending.drain() {
            let _ = sender.send(Err(LspError::Transport(reason.to_string())));
        }
    }

    /// How many calls are waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `fail_all` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatcher_new_empty() {
        let disp = Dispatcher::new();
        assert_eq!(disp.pending_count(), 0);
        assert!(!disp.is_closed());
    }

    #[tokio::test]
    async fn resolve_delivers_result() {
        let mut disp = Dispatcher::new();
        let rx = disp.register(1).unwrap();
        assert_eq!(disp.pending_count(), 1);
        assert!(disp.resolve(1, Ok(json!({"ok": true}))));
        assert_eq!(disp.pending_count(), 0);
        assert_eq!(rx.await.unwrap().unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn resolve_delivers_rpc_error() {
        let mut disp = Dispatcher::new();
        let rx = disp.register(1).unwrap();
        disp.resolve(
            1,
            Err(RpcError {
                code: -32600,
                message: "invalid".into(),
            }),
        );
        match rx.await.unwrap() {
            Err(LspError::Rpc { code, message }) => {
                assert_eq!(code, -32600);
                assert_eq!(message, "invalid");
            }
            other => panic!("expected Rpc, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resolve_routes_by_id() {
        let mut disp = Dispatcher::new();
        let rx1 = disp.register(1).unwrap();
        let rx2 = disp.register(2).unwrap();
        disp.resolve(2, Ok(json!("two")));
        disp.resolve(1, Ok(json!("one")));
        assert_eq!(rx1.await.unwrap().unwrap(), json!("one"));
        assert_eq!(rx2.await.unwrap().unwrap(), json!("two"));
    }

    #[test]
    fn resolve_unknown_id() {
        let mut disp = Dispatcher::new();
        assert!(!disp.resolve(99, Ok(Value::Null)));
    }

    #[test]
    fn resolve_after_receiver_dropped() {
        let mut disp = Dispatcher::new();
        drop(disp.register(1).unwrap());
        assert!(disp.resolve(1, Ok(Value::Null)));
        assert_eq!(disp.pending_count(), 0);
    }

    #[test]
    fn remove_pending() {
        let mut disp = Dispatcher::new();
        let _rx = disp.register(1).unwrap();
        assert!(disp.remove(1));
        assert!(!disp.remove(1));
        assert_eq!(disp.pending_count(), 0);
    }

    #[tokio::test]
    async fn fail_all_fails_pending_with_transport() {
        let mut disp = Dispatcher::new();
        let rx1 = disp.register(1).unwrap();
        let rx2 = disp.register(2).unwrap();
        disp.fail_all("server exited");
        assert_eq!(disp.pending_count(), 0);
        for rx in [rx1, rx2] {
            match rx.await.unwrap() {
                Err(LspError::Transport(msg)) => assert_eq!(msg, "server exited"),
                other => panic!("expected Transport, got: {:?}", other),
            }
        }
    }

    #[test]
    fn register_after_fail_all_is_rejected() {
        let mut disp = Dispatcher::new();
        disp.fail_all("closed");
        assert!(disp.is_closed());
        assert!(matches!(disp.register(1), Err(LspError::Transport(_))));
    }
}
