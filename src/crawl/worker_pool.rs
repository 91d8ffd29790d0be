//! Fixed-size pool of street workers draining one shared job queue, with a
//! single completion signal raised when the last worker returns.

use crate::crawl::dispatch::JobQueue;
use crate::crawl::worker::{Worker, WorkerContext};
use anyhow::{Context, Result};
use futures::FutureExt;
use std::{
    any::Any,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    workers_done_rx: watch::Receiver<bool>,
}

impl WorkerPool {
    /// Spawns `max_workers` tasks (at least one), all reading from `queue`.
    pub fn launch(
        max_workers: usize,
        context: WorkerContext,
        queue: JobQueue,
        shutdown: CancellationToken,
    ) -> Self {
        let max_workers = max_workers.max(1);
        let (workers_done_tx, workers_done_rx) = watch::channel(false);
        let remaining_workers = Arc::new(AtomicUsize::new(max_workers));
        let mut workers = Vec::with_capacity(max_workers);

        for worker_id in 0..max_workers {
            let worker = Worker::new(worker_id, context.clone(), queue.clone(), shutdown.clone());
            let workers_done = workers_done_tx.clone();
            let remaining_workers = remaining_workers.clone();

            let handle = tokio::spawn(async move {
                let result = std::panic::AssertUnwindSafe(worker.run())
                    .catch_unwind()
                    .await;

                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::error!(
                            worker = worker_id,
                            error = %err,
                            "worker task exited with error"
                        );
                    }
                    Err(panic_payload) => {
                        let panic_msg = panic_message(panic_payload.as_ref());
                        tracing::error!(
                            worker = worker_id,
                            panic = %panic_msg,
                            "worker task panicked"
                        );
                    }
                }

                if remaining_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let _ = workers_done.send(true);
                }
            });

            workers.push(handle);
        }

        tracing::info!(workers = max_workers, "street worker pool launched");

        Self {
            workers,
            workers_done_rx,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Receiver that turns `true` once every worker has returned.
    pub fn completion(&self) -> watch::Receiver<bool> {
        self.workers_done_rx.clone()
    }

    /// Blocks until the completion signal fires, then joins every task.
    pub async fn wait(self) -> Result<()> {
        let mut done = self.workers_done_rx;
        done.wait_for(|finished| *finished)
            .await
            .context("worker pool dropped its completion signal")?;

        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            handle
                .await
                .with_context(|| format!("failed to join worker {worker_id}"))?;
        }
        tracing::info!("street worker pool drained");
        Ok(())
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
