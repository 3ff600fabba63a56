//! Slideshow timing: hands the viewer a new artwork every dwell and turns
//! bursts of parameter changes into a single reload.

use std::future;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::{FeederCommand, ViewerEvent, ViewerNotifier};
use crate::tasks::files::ArtworkRotation;

/// A reload fires once parameters have stopped changing for this long.
pub const RELOAD_THROTTLE: Duration = Duration::from_millis(250);

#[instrument(skip_all, fields(artworks = rotation.len(), dwell = ?dwell))]
pub async fn run(
    mut rotation: ArtworkRotation,
    dwell: Duration,
    mut commands: Receiver<FeederCommand>,
    viewer: impl ViewerNotifier,
    cancel: CancellationToken,
) -> Result<()> {
    // First tick fires immediately so the first artwork shows at startup.
    let mut ticker = time::interval(dwell);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reload_at: Option<Instant> = None;

    loop {
        let reload_due = async move {
            match reload_at {
                Some(at) => time::sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting feeder task");
                break;
            }
            _ = ticker.tick() => {
                if !show_next(&mut rotation, &viewer) {
                    break;
                }
            }
            Some(command) = commands.recv() => match command {
                FeederCommand::Advance => {
                    if !show_next(&mut rotation, &viewer) {
                        break;
                    }
                    ticker.reset();
                }
                FeederCommand::ParametersChanged => {
                    reload_at = Some(Instant::now() + RELOAD_THROTTLE);
                }
            },
            () = reload_due => {
                reload_at = None;
                debug!("requesting artwork reload");
                if !viewer.notify(ViewerEvent::ReloadArtwork) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn show_next(rotation: &mut ArtworkRotation, viewer: &impl ViewerNotifier) -> bool {
    let path = rotation.advance();
    debug!(path = %path.display(), "next artwork");
    let delivered = viewer.notify(ViewerEvent::ShowArtwork(path));
    if !delivered {
        info!("viewer gone; stopping feeder");
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    fn rotation() -> ArtworkRotation {
        ArtworkRotation::from_vec(vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")], false)
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shows_first_artwork_immediately_and_advances_on_command() {
        let (tx, rx) = unbounded();
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            rotation(),
            Duration::from_secs(3600),
            cmd_rx,
            tx,
            cancel.clone(),
        ));

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, ViewerEvent::ShowArtwork(p) if p == PathBuf::from("a.jpg")));

        cmd_tx.send(FeederCommand::Advance).await.unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(second, ViewerEvent::ShowArtwork(p) if p == PathBuf::from("b.jpg")));

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn parameter_bursts_collapse_into_one_reload() {
        let (tx, rx) = unbounded();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            rotation(),
            Duration::from_secs(3600),
            cmd_rx,
            tx,
            cancel.clone(),
        ));
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ViewerEvent::ShowArtwork(_)
        ));

        for _ in 0..5 {
            cmd_tx.send(FeederCommand::ParametersChanged).await.unwrap();
        }
        let reload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(reload, ViewerEvent::ReloadArtwork));
        tokio::time::sleep(RELOAD_THROTTLE * 2).await;
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reload_waits_for_the_last_change() {
        let (tx, rx) = unbounded();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            rotation(),
            Duration::from_secs(3600),
            cmd_rx,
            tx,
            cancel.clone(),
        ));
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ViewerEvent::ShowArtwork(_)
        ));

        let pause = RELOAD_THROTTLE * 3 / 5;
        cmd_tx.send(FeederCommand::ParametersChanged).await.unwrap();
        tokio::time::sleep(pause).await;
        cmd_tx.send(FeederCommand::ParametersChanged).await.unwrap();
        tokio::time::sleep(pause).await;
        // Past the first change's deadline but not the second's.
        assert!(rx.try_recv().is_err());

        let reload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(reload, ViewerEvent::ReloadArtwork));

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_when_viewer_is_gone() {
        let (tx, rx) = unbounded::<ViewerEvent>();
        drop(rx);
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);
        run(
            rotation(),
            Duration::from_millis(10),
            cmd_rx,
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    }
}
