//! Mock collaborators shared by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::AppContext;
use crate::config::Submission;
use crate::engine::{EngineInput, EngineOutput, ExecutionBackend, Handle, InferenceEngine};
use crate::error::{BackendError, EngineError};

/// Ordered record of collaborator calls
pub type Events = Arc<Mutex<Vec<String>>>;

/// How [`MockBackend::wait`] resolves
#[derive(Clone, Copy)]
pub enum Resolve {
    /// `text:<prompt>`; prompts starting with "slow" resolve after 50ms
    Text,
    EngineFailure,
    ShuttingDown,
}

/// Backend that records submissions and resolves them per [`Resolve`]
pub struct MockBackend {
    pub submissions: Mutex<Vec<Submission>>,
    in_flight: Mutex<HashMap<Handle, String>>,
    next: AtomicU64,
    resolve: Resolve,
    teardown_fails: bool,
    events: Events,
    observe: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl MockBackend {
    pub fn new(resolve: Resolve) -> Self {
        Self {
            submissions: Mutex::default(),
            in_flight: Mutex::default(),
            next: AtomicU64::new(0),
            resolve,
            teardown_fails: false,
            events: Events::default(),
            observe: None,
        }
    }

    /// Record teardown in `events`, suffixed with whatever `observe` reports at that moment
    pub fn recording(
        mut self,
        events: Events,
        observe: Arc<dyn Fn() -> String + Send + Sync>,
        teardown_fails: bool,
    ) -> Self {
        self.events = events;
        self.observe = Some(observe);
        self.teardown_fails = teardown_fails;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    fn submit(&self, submission: Submission) -> Result<Handle, BackendError> {
        let handle = Handle::new(self.next.fetch_add(1, Ordering::SeqCst));
        self.in_flight
            .lock()
            .unwrap()
            .insert(handle, submission.prompt.clone());
        self.submissions.lock().unwrap().push(submission);
        Ok(handle)
    }

    async fn wait(&self, handle: Handle) -> Result<String, BackendError> {
        let prompt = self
            .in_flight
            .lock()
            .unwrap()
            .remove(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;

        match self.resolve {
            Resolve::Text => {
                if prompt.starts_with("slow") {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Ok(format!("text:{}", prompt))
            }
            Resolve::EngineFailure => Err(EngineError::Protocol("worker crashed".into()).into()),
            Resolve::ShuttingDown => Err(BackendError::ShuttingDown),
        }
    }

    async fn teardown(&self) -> Result<(), BackendError> {
        let seen = self.observe.as_ref().map(|f| f()).unwrap_or_default();
        self.events
            .lock()
            .unwrap()
            .push(format!("teardown{}", seen));
        if self.teardown_fails {
            return Err(BackendError::Worker("teardown failed".into()));
        }
        Ok(())
    }
}

/// Engine that only records `clear`
pub struct MockEngine {
    events: Events,
    observe: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    clear_fails: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            events: Events::default(),
            observe: None,
            clear_fails: false,
        }
    }

    pub fn recording(
        events: Events,
        observe: Arc<dyn Fn() -> String + Send + Sync>,
        clear_fails: bool,
    ) -> Self {
        Self {
            events,
            observe: Some(observe),
            clear_fails,
        }
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn infer(&self, batch: Vec<EngineInput>) -> Result<Vec<EngineOutput>, EngineError> {
        Ok(batch
            .into_iter()
            .map(|input| EngineOutput::Text { text: input.prompt })
            .collect())
    }

    async fn clear(&self) -> Result<(), EngineError> {
        let seen = self.observe.as_ref().map(|f| f()).unwrap_or_default();
        self.events.lock().unwrap().push(format!("clear{}", seen));
        if self.clear_fails {
            return Err(EngineError::Protocol("clear failed".into()));
        }
        Ok(())
    }
}

/// Engine whose calls never return
pub struct HangingEngine;

#[async_trait]
impl InferenceEngine for HangingEngine {
    async fn infer(&self, _batch: Vec<EngineInput>) -> Result<Vec<EngineOutput>, EngineError> {
        std::future::pending().await
    }

    async fn clear(&self) -> Result<(), EngineError> {
        std::future::pending().await
    }
}

/// Context over a [`MockBackend`] without tokenizer
pub fn mock_context(backend: Arc<MockBackend>) -> Arc<AppContext> {
    Arc::new(AppContext::new(backend, Arc::new(MockEngine::new()), None))
}
