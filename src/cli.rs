use crate::launcher::build_command;
use crate::model::{AppEvent, ProcessEvent};
use crate::orchestrator::{self, UiCommand};
use crate::store::ProfileStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// What the headless console prints: OpenOCD's own output goes to stdout, launcher
/// status markers go to stderr so piping stdout captures only OpenOCD.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleLine {
    Output(String),
    Running(String),
    Exited(Option<i32>),
    Notice(String),
}

impl ConsoleLine {
    fn is_status(&self) -> bool {
        !matches!(self, ConsoleLine::Output(_))
    }

    fn render(&self) -> String {
        match self {
            ConsoleLine::Output(line) | ConsoleLine::Notice(line) => line.clone(),
            ConsoleLine::Running(command) => format!("Running: {command}"),
            ConsoleLine::Exited(Some(code)) => format!("Exited {code}"),
            ConsoleLine::Exited(None) => "Exited by signal".to_string(),
        }
    }
}

/// Line-buffered console fed from async code and written on a blocking thread.
struct Console {
    tx: mpsc::UnboundedSender<ConsoleLine>,
    writer: tokio::task::JoinHandle<()>,
}

impl Console {
    fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ConsoleLine>();
        let writer = tokio::task::spawn_blocking(move || {
            let mut out = std::io::LineWriter::new(std::io::stdout().lock());
            let mut err = std::io::LineWriter::new(std::io::stderr().lock());
            while let Some(line) = rx.blocking_recv() {
                let sink: &mut dyn Write = if line.is_status() { &mut err } else { &mut out };
                let _ = writeln!(sink, "{}", line.render());
            }
            let _ = out.flush();
            let _ = err.flush();
        });
        Self { tx, writer }
    }

    fn print(&self, line: ConsoleLine) {
        let _ = self.tx.send(line);
    }

    /// Flush everything queued so far and stop the writer.
    async fn close(self) {
        drop(self.tx);
        let _ = self.writer.await;
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "openocd-launcher",
    version,
    about = "Profile manager and launcher for OpenOCD with optional TUI"
)]
pub struct Cli {
    /// Profile file (default: <config dir>/openocd-launcher/configs.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to use instead of the last selected one
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Print profile names and exit (no TUI)
    #[arg(long, conflicts_with_all = ["print_command", "run"])]
    pub list: bool,

    /// Print the OpenOCD command line, one argument per line, and exit (no TUI)
    #[arg(long, conflicts_with = "run")]
    pub print_command: bool,

    /// Launch OpenOCD and stream its output to stdout (no TUI). Ctrl-C terminates it.
    #[arg(long)]
    pub run: bool,

    /// Log file used while the TUI is active
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// True for the modes that print and exit instead of starting the TUI.
    pub fn is_headless(&self) -> bool {
        self.list || self.print_command || self.run || cfg!(not(feature = "tui"))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(p) => Ok(p.clone()),
            None => crate::paths::default_store_path(),
        }
    }
}

/// Load the store and apply `--profile`.
pub fn open_store(args: &Cli) -> Result<ProfileStore> {
    let mut store = ProfileStore::load(args.store_path()?);
    if let Some(name) = args.profile.as_deref() {
        if !store.contains(name) {
            anyhow::bail!(
                "unknown profile '{}' (available: {})",
                name,
                store.list_names().join(", ")
            );
        }
        store.select(name);
    }
    Ok(store)
}

/// Run the selected mode. Returns the process exit code for headless modes.
pub async fn run(args: Cli) -> Result<i32> {
    if args.list {
        let store = open_store(&args)?;
        for name in store.list_names() {
            let marker = if name == store.current_name() { "*" } else { " " };
            println!("{marker} {name}");
        }
        return Ok(0);
    }

    if args.print_command {
        let store = open_store(&args)?;
        let command = build_command(&store.current()).with_context(|| {
            format!("cannot build command for profile '{}'", store.current_name())
        })?;
        for arg in command.argv() {
            println!("{arg}");
        }
        return Ok(0);
    }

    if !args.run {
        #[cfg(feature = "tui")]
        {
            let store = open_store(&args)?;
            crate::tui::run(store).await?;
            return Ok(0);
        }
    }

    run_headless(&args).await
}

/// Launch the selected profile and relay its output until it exits.
async fn run_headless(args: &Cli) -> Result<i32> {
    let store = open_store(args)?;
    let profile = store.current();
    tracing::info!(profile = %store.current_name(), "headless launch");

    let console = Console::spawn();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let ctrl = tokio::spawn(orchestrator::run_controller(event_tx, cmd_rx));

    cmd_tx
        .send(UiCommand::Launch(Box::new(profile)))
        .map_err(|_| anyhow::anyhow!("controller stopped before launch"))?;

    let mut started = false;
    let mut interrupts = 0u8;
    let mut exit_code = 1;

    loop {
        tokio::select! {
            ev = event_rx.recv() => match ev {
                Some(AppEvent::Started { command, .. }) => {
                    started = true;
                    console.print(ConsoleLine::Running(command));
                }
                Some(AppEvent::Process(ProcessEvent::Line(line))) => {
                    console.print(ConsoleLine::Output(line));
                }
                Some(AppEvent::Process(ProcessEvent::Exited { code })) => {
                    console.print(ConsoleLine::Exited(code));
                    exit_code = code.unwrap_or(if interrupts > 0 { 130 } else { 1 });
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
                Some(AppEvent::Info(msg)) => {
                    console.print(ConsoleLine::Notice(msg));
                    if !started {
                        // Launch was refused; nothing will follow.
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if started => {
                interrupts = interrupts.saturating_add(1);
                // First Ctrl-C asks OpenOCD to stop, the next one kills it
                let cmd = if interrupts == 1 { UiCommand::Terminate } else { UiCommand::Kill };
                let _ = cmd_tx.send(cmd);
            }
        }
    }

    ctrl.await.context("controller task failed")??;
    console.close().await;
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_markers_go_to_stderr() {
        assert!(!ConsoleLine::Output("Info : Listening on port 3333".into()).is_status());
        assert!(ConsoleLine::Running("openocd -c init".into()).is_status());
        assert!(ConsoleLine::Notice("Sent terminate signal to OpenOCD process.".into()).is_status());
    }

    #[test]
    fn exit_markers_render_code_or_signal() {
        assert_eq!(ConsoleLine::Exited(Some(0)).render(), "Exited 0");
        assert_eq!(ConsoleLine::Exited(None).render(), "Exited by signal");
        assert_eq!(
            ConsoleLine::Running("/opt/oocd/bin/openocd -c init".into()).render(),
            "Running: /opt/oocd/bin/openocd -c init"
        );
    }

    #[test]
    fn modes_conflict() {
        assert!(Cli::try_parse_from(["openocd-launcher", "--list", "--run"]).is_err());
        let args = Cli::try_parse_from(["openocd-launcher", "--run", "-vv"]).unwrap();
        assert!(args.is_headless());
        assert_eq!(args.verbose, 2);
    }
}
