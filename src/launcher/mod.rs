//! OpenOCD process supervision.
//!
//! A [`Supervisor`] owns at most one child process. The child's stdout and stderr share one
//! pipe, so lines keep the order the child wrote them in. Each launch spawns a single relay
//! task that publishes those lines and finishes with one exit event. The relay never touches
//! supervisor state; the supervisor learns about the exit through a one-shot notification
//! the next time its state is queried.

mod command;
mod scan;

pub use command::{build_command, scripts_dir, LaunchCommand};
pub use scan::list_cfg_files;

use crate::error::LaunchError;
use crate::model::{ProcessEvent, Profile};
use std::io::{BufRead, BufReader, PipeReader};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone)]
pub enum ProcessControl {
    /// Ask the child to exit gracefully
    Terminate,
    /// Kill the child outright
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    Terminating,
}

/// Internal record of the live child.
struct ActiveRun {
    pid: Option<u32>,
    ctrl_tx: mpsc::UnboundedSender<ProcessControl>,
    exit_rx: oneshot::Receiver<Option<i32>>,
    terminating: bool,
}

/// Output side of a launch. Yields every line, then the exit event, then `None`.
pub struct RunHandle {
    pub command: LaunchCommand,
    pub pid: Option<u32>,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl RunHandle {
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }
}

#[derive(Default)]
pub struct Supervisor {
    active: Option<ActiveRun>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn state(&mut self) -> SupervisorState {
        self.reap();
        match &self.active {
            None => SupervisorState::Idle,
            Some(run) if run.terminating => SupervisorState::Terminating,
            Some(_) => SupervisorState::Running,
        }
    }

    /// Clear the active run once the relay has reported an exit.
    fn reap(&mut self) {
        let Some(run) = self.active.as_mut() else {
            return;
        };
        match run.exit_rx.try_recv() {
            Ok(code) => {
                tracing::info!(pid = ?run.pid, ?code, "openocd exited");
                self.active = None;
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                tracing::warn!(pid = ?run.pid, "output relay ended without exit status");
                self.active = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }
    }

    /// Spawn OpenOCD for `profile`. Must be called from within a Tokio runtime.
    pub fn start(&mut self, profile: &Profile) -> Result<RunHandle, LaunchError> {
        if self.state() != SupervisorState::Idle {
            return Err(LaunchError::AlreadyRunning);
        }
        let command = build_command(profile)?;
        let spawn_err = |source: std::io::Error| LaunchError::Spawn {
            program: command.program.clone(),
            source,
        };

        // One pipe for both streams keeps stdout and stderr lines in emission order
        let (reader, writer) = std::io::pipe().map_err(spawn_err)?;
        let writer_err = writer.try_clone().map_err(spawn_err)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .kill_on_drop(true);

        // On Windows, hide the console window
        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = cmd.spawn().map_err(spawn_err)?;
        // The command still holds the write ends; drop them so EOF follows the child's exit.
        drop(cmd);
        let pid = child.id();
        tracing::info!(?pid, command = %command.display(), "started openocd");

        let (event_tx, event_rx) = mpsc::unbounded_channel::<ProcessEvent>();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<ProcessControl>();
        let (exit_tx, exit_rx) = oneshot::channel::<Option<i32>>();
        let lines = spawn_line_reader(reader);
        tokio::spawn(relay_output(child, lines, event_tx, ctrl_rx, exit_tx));

        self.active = Some(ActiveRun {
            pid,
            ctrl_tx,
            exit_rx,
            terminating: false,
        });
        Ok(RunHandle {
            command,
            pid,
            events: event_rx,
        })
    }

    /// Request graceful termination. Returns immediately; the exit arrives as an event.
    pub fn terminate(&mut self) -> Result<(), LaunchError> {
        match self.state() {
            SupervisorState::Idle => Err(LaunchError::NotRunning),
            SupervisorState::Terminating => Ok(()),
            SupervisorState::Running => {
                if let Some(run) = self.active.as_mut() {
                    tracing::info!(pid = ?run.pid, "terminating openocd");
                    let _ = run.ctrl_tx.send(ProcessControl::Terminate);
                    run.terminating = true;
                }
                Ok(())
            }
        }
    }

    /// Kill the child without waiting for it to wind down.
    pub fn kill(&mut self) -> Result<(), LaunchError> {
        if self.state() == SupervisorState::Idle {
            return Err(LaunchError::NotRunning);
        }
        if let Some(run) = self.active.as_mut() {
            tracing::warn!(pid = ?run.pid, "killing openocd");
            let _ = run.ctrl_tx.send(ProcessControl::Kill);
            run.terminating = true;
        }
        Ok(())
    }
}

/// Strip a trailing `\r` and decode lossily.
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read the merged output pipe on a blocking thread. The channel closes at EOF.
fn spawn_line_reader(reader: PipeReader) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        for segment in BufReader::new(reader).split(b'\n') {
            match segment {
                Ok(bytes) => {
                    if tx.send(decode_line(bytes)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("output stream closed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Relay output until the pipe closes, then report the exit status.
async fn relay_output(
    mut child: Child,
    mut lines: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<ProcessEvent>,
    mut ctrl_rx: mpsc::UnboundedReceiver<ProcessControl>,
    exit_tx: oneshot::Sender<Option<i32>>,
) {
    let mut ctrl_open = true;

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    let _ = event_tx.send(ProcessEvent::Line(line));
                }
                None => break,
            },
            msg = ctrl_rx.recv(), if ctrl_open => match msg {
                Some(ProcessControl::Terminate) => signal_terminate(&mut child),
                Some(ProcessControl::Kill) => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("failed to kill openocd: {e}");
                    }
                }
                None => ctrl_open = false,
            },
        }
    }

    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!("failed to wait on openocd: {e}");
            None
        }
    };
    // Settle the supervisor before anyone sees the exit event
    let _ = exit_tx.send(code);
    let _ = event_tx.send(ProcessEvent::Exited { code });
}

#[cfg(unix)]
fn signal_terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(pid, "failed to send SIGTERM: {e}");
    }
}

#[cfg(not(unix))]
fn signal_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!("failed to kill openocd: {e}");
    }
}
