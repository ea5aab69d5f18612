use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

static CLIPBOARD: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();
const CLIPBOARD_HOLD: Duration = Duration::from_secs(2);

/// Write the output pane to a timestamped file under the output log directory.
pub fn write_output_log(lines: &[String]) -> Result<PathBuf> {
    let dir = crate::paths::output_log_dir()?;
    let now =
        time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let stamp = now
        .format(time::macros::format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("format timestamp")?;
    let path = dir.join(format!("openocd-{stamp}.log"));
    write_lines(&path, lines)?;
    Ok(path)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), lines = lines.len(), "wrote output log");
    Ok(())
}

/// Started on first copy. Each copy opens a fresh clipboard handle and holds it for
/// `CLIPBOARD_HOLD`, since X11/Wayland clipboard managers read from the owning process.
fn clipboard_worker() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                let copied = arboard::Clipboard::new().and_then(|mut clipboard| {
                    clipboard.set_text(text.as_str())?;
                    std::thread::sleep(CLIPBOARD_HOLD);
                    Ok(())
                });
                if let Err(e) = copied {
                    tracing::warn!("clipboard copy failed: {e}");
                }
            }
        });
        tx
    })
}

/// Queue a command line for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_worker()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("clipboard worker stopped"))
}
