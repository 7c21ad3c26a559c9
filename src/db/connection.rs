use std::{
    path::Path,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Opens the store file, applies connection pragmas and brings the schema up to date.
fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create database directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("failed to enable WAL mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// Runs queued jobs until every [`Database`] handle is gone.
fn serve_jobs(mut conn: Connection, jobs: mpsc::Receiver<Job>) {
    let mut served: u64 = 0;
    for job in jobs {
        job(&mut conn);
        served += 1;
    }
    info!("Session store worker stopped after {served} jobs");
}

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop.
        self.jobs.take();
        let thread = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!("Session store worker panicked");
            }
        }
    }
}

/// Handle to the SQLite connection owned by a dedicated worker thread.
///
/// Every call to [`Database::execute`] runs as one closure on that thread, so a
/// closure that reads, validates and writes is never interleaved with another
/// request's writes.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = open_store(path)?;

        let (jobs, queue) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("pomodoro-db".into())
            .spawn(move || serve_jobs(conn, queue))
            .context("failed to spawn database worker thread")?;

        info!("Session store ready at {}", path.display());
        Ok(Self {
            worker: Arc::new(Worker {
                jobs: Some(jobs),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // A caller that gave up no longer needs the result.
            let _ = reply.send(task(conn));
        });

        self.worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("session store is shut down"))?
            .send(job)
            .map_err(|_| anyhow!("session store worker is gone"))?;

        outcome
            .await
            .map_err(|_| anyhow!("session store worker dropped the job"))?
    }
}
