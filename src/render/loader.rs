//! Background decode worker and the single-slot handoffs around it.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, info};

use crate::render::prepare::{LoadParams, PreparedPicture, prepare_picture};
use crate::source::ImageSource;

/// Holds at most one value tagged with the generation that produced it.
/// A newer `put` replaces whatever is waiting.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<(u64, T)>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Mailbox<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, generation: u64, value: T) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((generation, value));
    }

    pub fn take(&self) -> Option<(u64, T)> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Take the value only if it belongs to `generation`; anything older is
    /// discarded.
    pub fn take_current(&self, generation: u64) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some((g, value)) if g == generation => Some(value),
            Some((g, value)) if g > generation => {
                *slot = Some((g, value));
                None
            }
            Some((g, _)) => {
                debug!(stale = g, current = generation, "discarding stale load result");
                None
            }
            None => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

/// Request for the worker to prepare one picture.
pub struct LoadJob {
    pub source: Arc<dyn ImageSource>,
    pub params: LoadParams,
}

/// Called from the worker thread after a result lands in the mailbox.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Runs [`prepare_picture`] off the render thread.
///
/// Jobs and results each travel through a single-slot [`Mailbox`]: a job
/// submitted while another waits replaces it, and only the newest result
/// is kept.
pub struct LoadWorker {
    jobs: Arc<Mailbox<LoadJob>>,
    results: Arc<Mailbox<PreparedPicture>>,
    mode: WorkerMode,
}

enum WorkerMode {
    Thread { wake: Sender<()> },
    Inline { waker: Option<Waker> },
}

impl LoadWorker {
    /// Spawn the worker thread.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(waker: Option<Waker>) -> std::io::Result<Self> {
        let jobs = Arc::new(Mailbox::new());
        let results = Arc::new(Mailbox::new());
        let (wake, wake_rx) = bounded::<()>(1);
        thread::Builder::new().name("picture-loader".into()).spawn({
            let jobs = Arc::clone(&jobs);
            let results = Arc::clone(&results);
            move || run(&wake_rx, &jobs, &results, waker.as_ref())
        })?;
        Ok(Self {
            jobs,
            results,
            mode: WorkerMode::Thread { wake },
        })
    }

    /// A worker that prepares pictures synchronously inside
    /// [`LoadWorker::submit`].
    #[must_use]
    pub fn inline(waker: Option<Waker>) -> Self {
        Self {
            jobs: Arc::new(Mailbox::new()),
            results: Arc::new(Mailbox::new()),
            mode: WorkerMode::Inline { waker },
        }
    }

    pub fn submit(&self, generation: u64, job: LoadJob) {
        match &self.mode {
            WorkerMode::Thread { wake } => {
                self.jobs.put(generation, job);
                match wake.try_send(()) {
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Disconnected(())) => {
                        debug!("picture loader thread is gone; dropping request");
                    }
                }
            }
            WorkerMode::Inline { waker } => {
                let prepared = prepare_picture(job.source.as_ref(), &job.params);
                self.results.put(generation, prepared);
                if let Some(waker) = waker {
                    waker();
                }
            }
        }
    }

    #[must_use]
    pub fn results(&self) -> &Mailbox<PreparedPicture> {
        &self.results
    }
}

fn run(
    wake: &Receiver<()>,
    jobs: &Mailbox<LoadJob>,
    results: &Mailbox<PreparedPicture>,
    waker: Option<&Waker>,
) {
    while wake.recv().is_ok() {
        while let Some((generation, job)) = jobs.take() {
            debug!(generation, "preparing picture");
            let prepared = prepare_picture(job.source.as_ref(), &job.params);
            results.put(generation, prepared);
            if let Some(waker) = waker {
                waker();
            }
        }
    }
    info!("picture loader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlurBackend;
    use crate::source::MemoryImageSource;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn job(width: u32) -> LoadJob {
        LoadJob {
            source: Arc::new(MemoryImageSource::new(RgbaImage::from_pixel(
                width,
                10,
                Rgba([0, 0, 0, 255]),
            ))),
            params: LoadParams {
                keyframe_count: 1,
                surface_height: 10,
                max_prescaled_blur_pixels: 0,
                blurred_sample_size: 4,
                max_dim: 128,
                max_grey: 0,
                demo_mode: false,
                blur_backend: BlurBackend::Cpu,
            },
        }
    }

    #[test]
    fn mailbox_keeps_only_the_latest_value() {
        let mailbox = Mailbox::new();
        mailbox.put(1, "a");
        mailbox.put(2, "b");
        assert_eq!(mailbox.take(), Some((2, "b")));
        assert!(mailbox.is_empty());
    }

    #[test]
    fn take_current_discards_stale_and_keeps_newer() {
        let mailbox = Mailbox::new();
        mailbox.put(1, "old");
        assert_eq!(mailbox.take_current(2), None);
        assert!(mailbox.is_empty());
        mailbox.put(3, "new");
        assert_eq!(mailbox.take_current(2), None);
        assert_eq!(mailbox.take_current(3), Some("new"));
    }

    #[test]
    fn inline_worker_prepares_immediately() {
        let woken = Arc::new(AtomicUsize::new(0));
        let waker: Waker = {
            let woken = Arc::clone(&woken);
            Arc::new(move || {
                woken.fetch_add(1, Ordering::SeqCst);
            })
        };
        let worker = LoadWorker::inline(Some(waker));
        worker.submit(7, job(20));
        let prepared = worker.results().take_current(7).unwrap();
        assert!((prepared.aspect_ratio - 2.0).abs() < 1e-6);
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thread_worker_delivers_results() {
        let worker = LoadWorker::spawn(None).unwrap();
        worker.submit(1, job(30));
        let deadline = Instant::now() + Duration::from_secs(10);
        let prepared = loop {
            if let Some(p) = worker.results().take_current(1) {
                break p;
            }
            assert!(Instant::now() < deadline, "worker did not deliver");
            thread::sleep(Duration::from_millis(5));
        };
        assert!(prepared.has_image);
    }
}
