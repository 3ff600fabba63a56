use std::path::PathBuf;

use crossbeam_channel::{Sender, TrySendError};
use tracing::debug;

/// Progress of a transition between artworks, keyed by picture-set id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchingPhotos {
    InProgress(usize),
    Done(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererStatus {
    SwitchingPhotos(SwitchingPhotos),
    ArtworkSize(ArtworkSize),
}

/// Receiver of renderer status. Implementations must not block.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: RendererStatus);
}

impl StatusSink for Sender<RendererStatus> {
    fn publish(&self, status: RendererStatus) {
        match self.try_send(status) {
            Ok(()) => {}
            Err(TrySendError::Full(status)) => debug!(?status, "status channel full; dropping"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn publish(&self, _status: RendererStatus) {}
}

/// Messages delivered to the viewer's event loop.
#[derive(Debug)]
pub enum ViewerEvent {
    /// Shut down.
    Cancelled,
    /// A new artwork should be shown.
    ShowArtwork(PathBuf),
    /// Re-run the load pipeline for the artwork on screen.
    ReloadArtwork,
    /// The render queue or load mailbox has work; draw a frame.
    Wake,
}

/// Requests from the viewer to the slideshow feeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederCommand {
    /// Skip the rest of the dwell and show the next artwork now.
    Advance,
    /// Renderer parameters changed; the current artwork must be rebuilt.
    ParametersChanged,
}

/// Delivers [`ViewerEvent`]s to the viewer's event loop from other threads.
pub trait ViewerNotifier: Send + Sync {
    /// Returns `false` once the viewer has gone away.
    fn notify(&self, event: ViewerEvent) -> bool;
}

impl ViewerNotifier for Sender<ViewerEvent> {
    fn notify(&self, event: ViewerEvent) -> bool {
        self.send(event).is_ok()
    }
}
