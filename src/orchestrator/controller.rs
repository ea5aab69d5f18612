//! Launch lifecycle controller.
//!
//! Owns the process supervisor, applies start/terminate requests and emits events for
//! presentation layers.

use crate::launcher::{RunHandle, Supervisor};
use crate::model::{AppEvent, ProcessEvent, Profile};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

/// How long Quit waits after SIGTERM before killing the child.
const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Commands emitted by UI layers to control OpenOCD.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    // Boxed to keep the enum small; Profile carries several vectors.
    Launch(Box<Profile>),
    Terminate,
    Kill,
    Quit,
}

/// Apply UI commands to the supervisor and forward its output back to presentation layers.
pub(crate) async fn run_controller(
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut supervisor = Supervisor::new();
    let mut run: Option<RunHandle> = None;
    let mut quit_pending = false;
    // Terminate watchdog: if the child ignores SIGTERM for a while, keep the user informed,
    // and kill it when we are quitting.
    let mut terminate_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Launch(profile)) => match supervisor.start(&profile) {
                        Ok(handle) => {
                            let _ = event_tx.send(AppEvent::Started {
                                command: handle.command.display(),
                                pid: handle.pid,
                            });
                            run = Some(handle);
                        }
                        Err(e) => {
                            tracing::warn!("launch refused: {e}");
                            let _ = event_tx.send(AppEvent::Info(e.to_string()));
                        }
                    },
                    Some(UiCommand::Terminate) => match supervisor.terminate() {
                        Ok(()) => {
                            let _ = event_tx.send(AppEvent::Info(
                                "Sent terminate signal to OpenOCD process.".into(),
                            ));
                            terminate_deadline =
                                Some(tokio::time::Instant::now() + Duration::from_secs(3));
                        }
                        Err(e) => {
                            let _ = event_tx.send(AppEvent::Info(e.to_string()));
                        }
                    },
                    Some(UiCommand::Kill) => match supervisor.kill() {
                        Ok(()) => {
                            let _ = event_tx.send(AppEvent::Info("Killed OpenOCD process.".into()));
                            terminate_deadline = None;
                        }
                        Err(e) => {
                            let _ = event_tx.send(AppEvent::Info(e.to_string()));
                        }
                    },
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the child to exit so it is never left orphaned.
                        quit_pending = true;
                        if run.is_some() {
                            let _ = supervisor.terminate();
                            terminate_deadline = Some(tokio::time::Instant::now() + QUIT_GRACE);
                            let _ = event_tx.send(AppEvent::Info("Stopping OpenOCD…".into()));
                        } else {
                            break Ok(());
                        }
                    }
                }
            }
            ev = async {
                match run.as_mut() {
                    Some(handle) => handle.next_event().await,
                    None => futures::future::pending().await,
                }
            } => {
                match ev {
                    Some(ev) => {
                        if let ProcessEvent::Exited { code } = &ev {
                            tracing::debug!(?code, "forwarding exit event");
                        }
                        let _ = event_tx.send(AppEvent::Process(ev));
                    }
                    None => {
                        run = None;
                        terminate_deadline = None;
                        if quit_pending {
                            break Ok(());
                        }
                    }
                }
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = terminate_deadline {
                    if tokio::time::Instant::now() >= deadline && run.is_some() {
                        if quit_pending {
                            tracing::warn!("openocd ignored SIGTERM during quit, killing it");
                            let _ = supervisor.kill();
                        } else {
                            let _ = event_tx.send(AppEvent::Info(
                                "Still waiting for OpenOCD to exit…".into(),
                            ));
                        }
                        terminate_deadline = None;
                    }
                }
            }
        }
    };

    res
}
