//! Background worker pool for image decoding.
//!
//! Uses work-stealing deques so fresh decode requests win over stale ones:
//! - New tasks land in the global injector (checked before stealing)
//! - Workers steal aged tasks from each other when idle
//!
//! The epoch mechanism cancels requests that became irrelevant before a
//! worker picked them up (e.g. the user cleared a region while its upload
//! was still queued). Decode never blocks the render tick: `setImage`
//! enqueues and returns, results come back over a channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::deque::{Injector, Worker};
use log::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Work-stealing worker pool with epoch-based cancellation.
///
/// # Example
/// ```ignore
/// let workers = Workers::new(4);
/// let epoch = workers.current_epoch();
/// workers.execute_with_epoch(epoch, move || {
///     let decoded = PixelImage::decode_path(&path);
///     tx.send((region, decoded)).ok();
/// });
/// ```
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    epoch: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Create the pool. Decode work is bursty; `num_cpus::get() / 2`
    /// leaves headroom for the composite's rayon passes.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let epoch = Arc::new(AtomicU64::new(0));

        let mut workers_local: Vec<Worker<Job>> = Vec::new();
        let mut stealers = Vec::new();
        let mut handles = Vec::new();

        for _ in 0..num_threads {
            let worker: Worker<Job> = Worker::new_fifo();
            stealers.push(worker.stealer());
            workers_local.push(worker);
        }

        for (worker_id, worker) in workers_local.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let handle = thread::Builder::new()
                .name(format!("stoffa-decode-{}", worker_id))
                .spawn(move || {
                    trace!("Decode worker {} started", worker_id);

                    loop {
                        // 1. Own queue first (cache locality)
                        if let Some(job) = worker.pop() {
                            job();
                            continue;
                        }
                        // 2. Global injector (freshest requests)
                        if let Some(job) = injector.steal().success() {
                            job();
                            continue;
                        }
                        // 3. Steal aged tasks from peers
                        let mut found = false;
                        for stealer in &stealers {
                            if let Some(job) = stealer.steal().success() {
                                job();
                                found = true;
                                break;
                            }
                        }
                        if found {
                            continue;
                        }
                        // 4. Shutdown check
                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        // 5. Idle - short sleep instead of spinning
                        thread::sleep(std::time::Duration::from_millis(1));
                    }

                    trace!("Decode worker {} stopped", worker_id);
                })
                .expect("Failed to spawn decode worker");

            handles.push(handle);
        }

        trace!("Workers initialized: {} threads (work-stealing)", num_threads);

        Self {
            injector,
            handles,
            epoch,
            shutdown,
        }
    }

    /// Execute a closure on a worker thread.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.injector.push(Box::new(f));
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Relaxed)
    }

    /// Invalidate every job enqueued under previous epochs. Jobs already
    /// running are unaffected; their results are filtered by the session's
    /// per-region tokens.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Execute with epoch check at execution time (not enqueue time): a
    /// job whose epoch no longer matches is silently skipped, so a burst
    /// of uploads followed by "clear all" does no wasted decoding.
    pub fn execute_with_epoch<F>(&self, epoch: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let current = Arc::clone(&self.epoch);
        let wrapped = move || {
            if current.load(Ordering::Relaxed) == epoch {
                f();
            }
        };
        self.injector.push(Box::new(wrapped));
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        use std::time::{Duration, Instant};

        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // Wait with timeout; epoch-checked stragglers skip themselves, so
        // this is a safety net, not the shutdown path.
        let deadline = Instant::now() + Duration::from_millis(500);
        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped gracefully", num_threads);
    }
}
