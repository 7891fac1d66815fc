//! In-memory transport and status sink doubles for engine tests

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use endpoint_pool::Pool;
use transport::{Destination, MessageRef, SendError, StatusSink, Transport};

/// Transport that replays a script of outcomes, then falls back to `rule`
/// (or success). Every attempted text is recorded.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<transport::Result<()>>>,
    rule: Option<fn(&str) -> transport::Result<()>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn always_ok() -> Arc<Self> {
        Self::scripted(vec![])
    }

    pub fn scripted(script: Vec<transport::Result<()>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            rule: None,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn with_rule(rule: fn(&str) -> transport::Result<()>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            rule: Some(rule),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn id(&self) -> &str {
        "scripted"
    }

    fn send<'a>(
        &'a self,
        _destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = transport::Result<()>> + Send + 'a>> {
        self.attempts.lock().unwrap().push(text.to_string());
        let scripted = self.script.lock().unwrap().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => self.rule.map_or(Ok(()), |rule| rule(text)),
        };
        Box::pin(async move { result })
    }
}

/// Pool of `n` endpoints all backed by the same transport.
pub fn shared_pool(transport: Arc<ScriptedTransport>, n: usize) -> Arc<Pool> {
    let transports: Vec<Arc<dyn Transport>> = (0..n)
        .map(|_| transport.clone() as Arc<dyn Transport>)
        .collect();
    Arc::new(Pool::new(transports).unwrap())
}

pub fn rate_limited(secs: u64) -> transport::Result<()> {
    Err(SendError::RateLimited {
        retry_after: Duration::from_secs(secs),
    })
}

#[derive(Debug, Default, Clone, Copy)]
enum SinkMode {
    #[default]
    Healthy,
    FailingEdits,
    Unreachable,
}

/// Status sink recording every posted and edited text.
#[derive(Default)]
pub struct RecordingSink {
    mode: SinkMode,
    posts: Mutex<Vec<String>>,
    edits: Mutex<Vec<String>>,
    edit_attempts: Mutex<u32>,
}

impl RecordingSink {
    pub fn failing_edits() -> Self {
        Self {
            mode: SinkMode::FailingEdits,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            mode: SinkMode::Unreachable,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn edit_attempts(&self) -> u32 {
        *self.edit_attempts.lock().unwrap()
    }

    /// Most recent status text, whether posted or edited.
    pub fn last_status(&self) -> Option<String> {
        let edits = self.edits();
        let posts = self.posts();
        match self.mode {
            SinkMode::Healthy => edits.last().or(posts.last()).cloned(),
            _ => posts.last().cloned(),
        }
    }
}

impl StatusSink for RecordingSink {
    fn post<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = transport::Result<MessageRef>> + Send + 'a>> {
        let result = match self.mode {
            SinkMode::Unreachable => Err(SendError::Transient("connection refused".into())),
            _ => {
                let mut posts = self.posts.lock().unwrap();
                posts.push(text.to_string());
                Ok(MessageRef {
                    destination: destination.clone(),
                    message_id: posts.len() as i64,
                })
            }
        };
        Box::pin(async move { result })
    }

    fn edit<'a>(
        &'a self,
        _message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = transport::Result<()>> + Send + 'a>> {
        *self.edit_attempts.lock().unwrap() += 1;
        let result = match self.mode {
            SinkMode::Healthy => {
                self.edits.lock().unwrap().push(text.to_string());
                Ok(())
            }
            _ => Err(SendError::Permanent("message can't be edited".into())),
        };
        Box::pin(async move { result })
    }
}
