//! Scripted `RemoteSource` double for refresh tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use super::source::{RemoteSource, RequestSpec};
use crate::errors::FetchError;

type Reply = Result<Value, FetchError>;

enum Script {
    Reply(Reply),
    Hang,
}

/// Per-path scripted responses. A gated reply is consumed once, in FIFO
/// order, before falling back to the path's standing reply.
#[derive(Default)]
pub struct ScriptedSource {
    standing: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Reply>>>>,
    calls: Mutex<Vec<String>>,
}

/// Releases one gated reply.
pub struct Gate {
    tx: oneshot::Sender<Reply>,
}

impl Gate {
    pub fn release(self, reply: Reply) {
        let _ = self.tx.send(reply);
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, path: &str, value: Value) -> Self {
        self.standing
            .lock()
            .unwrap()
            .insert(path.to_string(), Script::Reply(Ok(value)));
        self
    }

    pub fn fail(self, path: &str, err: FetchError) -> Self {
        self.standing
            .lock()
            .unwrap()
            .insert(path.to_string(), Script::Reply(Err(err)));
        self
    }

    pub fn hang(self, path: &str) -> Self {
        self.standing
            .lock()
            .unwrap()
            .insert(path.to_string(), Script::Hang);
        self
    }

    pub fn gate(&self, path: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(rx);
        Gate { tx }
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn server_error(path: &str) -> FetchError {
    FetchError::Server {
        path: path.to_string(),
        status: 500,
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn fetch(&self, request: &RequestSpec) -> Result<Value, FetchError> {
        let path = request.path().to_string();
        self.calls.lock().unwrap().push(path.clone());

        let gated = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(|queue| queue.pop_front());
        if let Some(rx) = gated {
            return match rx.await {
                Ok(reply) => reply,
                Err(_) => std::future::pending().await,
            };
        }

        let standing = match self.standing.lock().unwrap().get(&path) {
            Some(Script::Reply(reply)) => Some(reply.clone()),
            Some(Script::Hang) => None,
            None => Some(Err(FetchError::Server {
                path: path.clone(),
                status: 404,
            })),
        };
        match standing {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }
}
