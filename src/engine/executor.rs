//! Batching executor
//!
//! Queues submitted requests and hands them to an inference engine in
//! batches of up to `max_batch_size`, resolving each caller's handle with
//! its own output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{EngineInput, EngineOutput, ExecutionBackend, Handle, InferenceEngine};
use crate::config::{BatchConfig, Submission};
use crate::error::{BackendError, EngineError};
use crate::tokenizer::TokenizerTrait;

type Reply = Result<String, BackendError>;

/// How long `teardown` waits for a running batch before aborting the worker
pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct Job {
    handle: Handle,
    submission: Submission,
    reply: oneshot::Sender<Reply>,
}

/// Batching [`ExecutionBackend`] in front of an [`InferenceEngine`]
pub struct Executor {
    queue: mpsc::Sender<Job>,
    /// Receivers parked between `submit` and `wait`
    pending: DashMap<Handle, oneshot::Receiver<Reply>>,
    next_handle: AtomicU64,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    max_queue_size: usize,
    teardown_timeout: Duration,
}

impl Executor {
    /// Spawn the batching worker. Must be called inside a tokio runtime.
    pub fn start(
        engine: Arc<dyn InferenceEngine>,
        tokenizer: Option<Arc<dyn TokenizerTrait>>,
        config: BatchConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.max_queue_size);
        let shutdown = CancellationToken::new();

        let worker = Worker {
            engine,
            tokenizer,
            max_batch_size: config.max_batch_size,
            queue: rx,
            shutdown: shutdown.clone(),
        };

        tracing::info!(
            "Starting executor (max_batch_size={}, max_queue_size={})",
            config.max_batch_size,
            config.max_queue_size
        );

        Self {
            queue: tx,
            pending: DashMap::new(),
            next_handle: AtomicU64::new(0),
            shutdown,
            worker: Mutex::new(Some(tokio::spawn(worker.run()))),
            max_queue_size: config.max_queue_size,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    /// Bound the wait for the worker during [`ExecutionBackend::teardown`]
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }
}

#[async_trait]
impl ExecutionBackend for Executor {
    fn submit(&self, submission: Submission) -> Result<Handle, BackendError> {
        if self.shutdown.is_cancelled() {
            return Err(BackendError::ShuttingDown);
        }

        let handle = Handle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();
        self.pending.insert(handle, rx);

        let job = Job {
            handle,
            submission,
            reply,
        };
        if let Err(err) = self.queue.try_send(job) {
            self.pending.remove(&handle);
            return Err(match err {
                TrySendError::Full(_) => BackendError::QueueFull(self.max_queue_size),
                TrySendError::Closed(_) => BackendError::ShuttingDown,
            });
        }

        tracing::debug!("Submitted {}", handle);
        Ok(handle)
    }

    async fn wait(&self, handle: Handle) -> Result<String, BackendError> {
        let (_, rx) = self
            .pending
            .remove(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;

        // A dropped sender means the worker stopped before reaching this job
        rx.await.unwrap_or(Err(BackendError::ShuttingDown))
    }

    async fn teardown(&self) -> Result<(), BackendError> {
        self.shutdown.cancel();

        let worker = self.worker.lock().await.take();
        match worker {
            Some(mut worker) => {
                tracing::info!("Waiting for executor worker to stop");
                match tokio::time::timeout(self.teardown_timeout, &mut worker).await {
                    Ok(joined) => joined.map_err(|e| BackendError::Worker(e.to_string()))?,
                    Err(_) => {
                        // Dropping the aborted worker drops every reply sender it holds
                        worker.abort();
                        tracing::warn!(
                            "Executor worker still busy after {:?}, aborted",
                            self.teardown_timeout
                        );
                        return Err(BackendError::Worker(format!(
                            "worker did not stop within {:?}",
                            self.teardown_timeout
                        )));
                    }
                }
                tracing::info!("Executor stopped");
            }
            None => tracing::debug!("Executor already torn down"),
        }
        Ok(())
    }
}

/// Owns the queue's receiving end and drives the engine
struct Worker {
    engine: Arc<dyn InferenceEngine>,
    tokenizer: Option<Arc<dyn TokenizerTrait>>,
    max_batch_size: usize,
    queue: mpsc::Receiver<Job>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let mut batch = Vec::with_capacity(self.max_batch_size);

        loop {
            // Shutdown is only observed between batches, so a running batch completes
            let received = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                n = self.queue.recv_many(&mut batch, self.max_batch_size) => n,
            };
            if received == 0 {
                break;
            }
            self.process(batch.drain(..).collect()).await;
        }

        self.queue.close();
        let mut cancelled = 0;
        while let Ok(job) = self.queue.try_recv() {
            let _ = job.reply.send(Err(BackendError::ShuttingDown));
            cancelled += 1;
        }
        if cancelled > 0 {
            tracing::warn!("Cancelled {} queued requests on shutdown", cancelled);
        }
    }

    async fn process(&self, jobs: Vec<Job>) {
        let mut inputs = Vec::with_capacity(jobs.len());
        let mut waiting = Vec::with_capacity(jobs.len());

        for job in jobs {
            if job.reply.is_closed() {
                tracing::debug!("Skipping {}: caller went away", job.handle);
                continue;
            }
            match self.prepare(job.submission) {
                Ok(input) => {
                    inputs.push(input);
                    waiting.push((job.handle, job.reply));
                }
                Err(e) => {
                    let _ = job.reply.send(Err(e));
                }
            }
        }

        if waiting.is_empty() {
            return;
        }

        let batch_size = waiting.len();
        tracing::debug!("Running batch of {}", batch_size);

        let outputs = match self.engine.infer(inputs).await {
            Ok(outputs) if outputs.len() == batch_size => outputs,
            Ok(outputs) => {
                let err = EngineError::Protocol(format!(
                    "expected {} outputs, got {}",
                    batch_size,
                    outputs.len()
                ));
                return Self::fail_all(waiting, err);
            }
            Err(err) => return Self::fail_all(waiting, err),
        };

        for ((handle, reply), output) in waiting.into_iter().zip(outputs) {
            if reply.send(self.finish(output)).is_err() {
                tracing::debug!("Dropping result for {}: caller went away", handle);
            }
        }
    }

    fn prepare(&self, submission: Submission) -> Result<EngineInput, BackendError> {
        let input_ids = match &self.tokenizer {
            Some(tokenizer) => Some(
                tokenizer
                    .encode(&submission.prompt)
                    .map_err(|e| BackendError::Tokenizer(e.to_string()))?,
            ),
            None => None,
        };

        Ok(EngineInput {
            prompt: submission.prompt,
            input_ids,
            params: submission.params,
        })
    }

    fn finish(&self, output: EngineOutput) -> Result<String, BackendError> {
        match output {
            EngineOutput::Text { text } => Ok(text),
            EngineOutput::Tokens { output_ids } => match &self.tokenizer {
                Some(tokenizer) => tokenizer
                    .decode(&output_ids)
                    .map_err(|e| BackendError::Tokenizer(e.to_string())),
                None => Err(BackendError::Tokenizer(
                    "engine returned token ids but no tokenizer is configured".to_string(),
                )),
            },
        }
    }

    fn fail_all(waiting: Vec<(Handle, oneshot::Sender<Reply>)>, err: EngineError) {
        tracing::warn!("Batch of {} failed: {}", waiting.len(), err);
        let err = Arc::new(err);
        for (_, reply) in waiting {
            let _ = reply.send(Err(BackendError::Engine(Arc::clone(&err))));
        }
    }
}
