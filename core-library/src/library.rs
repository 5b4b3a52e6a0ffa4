//! # Local Library Engine
//!
//! Executes [`Query`] units against the local SQLite database on a single
//! dedicated worker thread.
//!
//! ## Overview
//!
//! The worker owns a current-thread tokio runtime and the only database
//! connection. Jobs arrive over an unbounded channel and run strictly in
//! submission order. Synchronous submitters block on a completion channel,
//! so a caller observes the query in a terminal state as soon as `enqueue`
//! returns.
//!
//! A query that returns an error or panics is marked `Failed`; the worker
//! keeps serving the next job. A transaction a query leaves open is rolled
//! back before that job completes, and the query is marked `Failed`.
//!
//! Synchronous submission blocks the calling thread. From async code, call
//! it through `tokio::task::spawn_blocking`, never directly on a runtime
//! worker thread.

use crate::adapters::SqliteAdapter;
use crate::error::{LibraryError, Result};
use crate::query::{Library, Query, QueryMode, QueryStatus};
use bridge_traits::database::{DatabaseAdapter, DatabaseConfig};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct Job {
    query: Arc<dyn Query>,
    done: Option<std_mpsc::Sender<()>>,
}

/// Single-worker query engine over a local SQLite database
pub struct LocalLibrary {
    sender: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl LocalLibrary {
    /// Start the worker, open the database and run migrations
    ///
    /// Returns once the worker is ready to accept queries. Failures while
    /// opening the database are returned here rather than surfacing on the
    /// first query.
    pub fn open(config: DatabaseConfig, thread_name: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        info!(
            database_url = %config.database_url,
            thread = thread_name,
            "Starting library worker"
        );

        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(LibraryError::Engine(format!(
                            "Failed to build worker runtime: {}",
                            e
                        ))));
                        return;
                    }
                };

                runtime.block_on(run_worker(config, receiver, ready_tx));
            })
            .map_err(|e| LibraryError::Engine(format!("Failed to spawn worker thread: {}", e)))?;

        let startup = ready_rx.recv().unwrap_or_else(|_| {
            Err(LibraryError::Engine(
                "Library worker exited during startup".to_string(),
            ))
        });

        if let Err(e) = startup {
            if worker.join().is_err() {
                error!("Library worker panicked during startup");
            }
            return Err(e);
        }

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// In-memory library; contents vanish when the library is dropped
    pub fn open_in_memory() -> Result<Self> {
        Self::open(DatabaseConfig::in_memory(), "library-worker")
    }
}

impl Library for LocalLibrary {
    fn enqueue(&self, query: Arc<dyn Query>, mode: QueryMode) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| LibraryError::Engine("Library is closed".to_string()))?;

        if query.status() != QueryStatus::Idle {
            return Err(LibraryError::invalid_input(
                "query",
                format!("{} was already submitted", query.name()),
            ));
        }

        match mode {
            QueryMode::Asynchronous => sender
                .send(Job { query, done: None })
                .map_err(|_| LibraryError::Engine("Library worker stopped".to_string())),
            QueryMode::Synchronous => {
                let (done_tx, done_rx) = std_mpsc::channel();
                sender
                    .send(Job {
                        query,
                        done: Some(done_tx),
                    })
                    .map_err(|_| LibraryError::Engine("Library worker stopped".to_string()))?;

                done_rx.recv().map_err(|_| {
                    LibraryError::Engine("Library worker stopped before finishing".to_string())
                })
            }
        }
    }
}

impl Drop for LocalLibrary {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop after queued jobs drain.
        self.sender.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Library worker panicked");
            }
        }
    }
}

async fn run_worker(
    config: DatabaseConfig,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    ready: std_mpsc::Sender<Result<()>>,
) {
    let mut adapter = match SqliteAdapter::new(config).await {
        Ok(adapter) => adapter,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };

    if let Err(e) = adapter.initialize().await {
        let _ = ready.send(Err(e.into()));
        return;
    }

    if ready.send(Ok(())).is_err() {
        return;
    }
    info!("Library worker ready");

    while let Some(job) = receiver.recv().await {
        execute(&adapter, job.query.as_ref()).await;

        if let Some(done) = job.done {
            let _ = done.send(());
        }
    }

    if let Err(e) = adapter.close().await {
        warn!(error = %e, "Failed to close library database");
    }
    info!("Library worker stopped");
}

async fn execute(adapter: &SqliteAdapter, query: &dyn Query) {
    let name = query.name();
    query.state().set(QueryStatus::Running);
    debug!(query = name, "Running query");

    let outcome = AssertUnwindSafe(query.run(adapter)).catch_unwind().await;

    let mut status = match outcome {
        Ok(Ok(())) => QueryStatus::Finished,
        Ok(Err(e)) => {
            warn!(query = name, error = %e, "Query failed");
            QueryStatus::Failed
        }
        Err(_) => {
            error!(query = name, "Query panicked");
            QueryStatus::Failed
        }
    };

    // Whatever a query left uncommitted is discarded before the next job runs.
    match adapter.rollback_if_open().await {
        Ok(false) => {}
        Ok(true) => {
            warn!(query = name, "Rolled back transaction left open by query");
            status = QueryStatus::Failed;
        }
        Err(e) => {
            error!(query = name, error = %e, "Failed to roll back open transaction");
            status = QueryStatus::Failed;
        }
    }

    query.state().set(status);
    debug!(query = name, status = ?status, "Query completed");
}
