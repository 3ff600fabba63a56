//! Work posted to the render thread from elsewhere, drained once per frame
//! before drawing.

use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::debug;

use crate::render::pipeline::PicturePipeline;

pub type RenderTask = Box<dyn FnOnce(&mut PicturePipeline, Instant) + Send>;

/// Cloneable handle for posting tasks.
#[derive(Clone)]
pub struct RenderQueueHandle {
    tx: Sender<RenderTask>,
}

impl RenderQueueHandle {
    /// Queue `task`. Returns `false` if the render thread is gone.
    pub fn post(&self, task: impl FnOnce(&mut PicturePipeline, Instant) + Send + 'static) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }
}

pub struct RenderQueue {
    tx: Sender<RenderTask>,
    rx: Receiver<RenderTask>,
}

impl Default for RenderQueue {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl RenderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handle(&self) -> RenderQueueHandle {
        RenderQueueHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every task queued so far, in order.
    pub fn drain(&self, pipeline: &mut PicturePipeline, now: Instant) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(pipeline, now);
            ran += 1;
        }
        if ran > 0 {
            debug!(ran, "drained render tasks");
        }
        ran
    }
}
