mod export;
mod help;
mod state;

use crate::launcher::build_command;
use crate::model::{AppEvent, Setting};
use crate::orchestrator::{self, UiCommand};
use crate::store::ProfileStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{copy_to_clipboard, write_output_log};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{Field, Input, UiState, TAB_HELP, TAB_OUTPUT, TAB_PROFILE};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(store: ProfileStore) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(store, event_rx, cmd_tx));

    let res = orchestrator::run_controller(event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    store: ProfileStore,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(store);
    tracing::info!(
        profile = %state.store.current_name(),
        store = %state.store.path().display(),
        "tui started"
    );

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Apply one key press. Returns true when the user asked to quit.
fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> bool {
    if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
        return true;
    }

    if state.input != Input::Normal {
        match k.code {
            KeyCode::Enter => state.commit_input(),
            KeyCode::Esc => state.cancel_input(),
            KeyCode::Backspace => state.input_backspace(),
            KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => {
                state.input_char(c)
            }
            _ => {}
        }
        return false;
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) => return true,
        (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 3,
        (_, KeyCode::Char('?')) => state.tab = TAB_HELP,
        (_, KeyCode::Char('r')) => {
            if state.running {
                state.info = "OpenOCD is already running".into();
            } else {
                state.info = "Launching…".into();
                let _ = cmd_tx.send(UiCommand::Launch(Box::new(state.form.clone())));
            }
        }
        (_, KeyCode::Char('t')) => {
            let _ = cmd_tx.send(UiCommand::Terminate);
        }
        (_, KeyCode::Char('s')) => state.save(),
        (_, KeyCode::Char('n')) => state.begin_save_as(),
        (_, KeyCode::Char('y')) => {
            state.info = match build_command(&state.form) {
                Ok(cmd) => match copy_to_clipboard(&cmd.display()) {
                    Ok(()) => "✓ Copied command to clipboard".into(),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                },
                Err(e) => format!("Cannot build command: {e}"),
            };
        }
        _ if state.tab == TAB_PROFILE => handle_profile_key(state, k),
        _ if state.tab == TAB_OUTPUT => handle_output_key(state, k),
        _ => {}
    }
    false
}

fn handle_profile_key(state: &mut UiState, k: KeyEvent) {
    match k.code {
        KeyCode::Up | KeyCode::Char('k') => state.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => state.select_next(),
        KeyCode::Left => state.cycle(false),
        KeyCode::Right => state.cycle(true),
        KeyCode::Enter => state.begin_edit(),
        KeyCode::Char(' ') => state.toggle_enabled(),
        KeyCode::Char('x') | KeyCode::Delete => state.remove_last_item(),
        _ => {}
    }
}

fn handle_output_key(state: &mut UiState, k: KeyEvent) {
    match k.code {
        KeyCode::Up | KeyCode::Char('k') => state.scroll_output(1),
        KeyCode::Down | KeyCode::Char('j') => state.scroll_output(-1),
        KeyCode::PageUp => state.scroll_output(20),
        KeyCode::PageDown => state.scroll_output(-20),
        KeyCode::Home => state.scroll_output(state.output.len() as isize),
        KeyCode::End => state.output_scroll = 0,
        KeyCode::Char('c') => {
            state.clear_output();
            state.info = "Output cleared".into();
        }
        KeyCode::Char('w') => {
            state.info = match write_output_log(&state.output) {
                Ok(path) => format!("Saved output: {}", path.display()),
                Err(e) => format!("Saving output failed: {e:#}"),
            };
        }
        _ => {}
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let output_title = if state.running {
        "Output (running)"
    } else {
        "Output"
    };
    let tabs = Tabs::new(vec![
        Line::from("Profile"),
        Line::from(output_title),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("openocd-launcher"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_PROFILE => draw_profile(chunks[1], f, state),
        TAB_OUTPUT => draw_output(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }

    draw_status(chunks[2], f, state);
}

fn setting_spans(setting: &Setting) -> Vec<Span<'static>> {
    let (mark, style) = if setting.enabled {
        ("[x] ", Style::default().fg(Color::Green))
    } else {
        ("[ ] ", Style::default().fg(Color::DarkGray))
    };
    let value = if setting.value.is_empty() {
        "-".to_string()
    } else {
        setting.value.clone()
    };
    vec![Span::styled(mark, style), Span::raw(value)]
}

const LABEL_WIDTH: usize = 24;

fn field_lines(state: &UiState, field: Field, selected: bool) -> Vec<Line<'static>> {
    let label_style = if selected {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let hint = Style::default().fg(Color::DarkGray);
    let cursor = Style::default().fg(Color::Yellow);
    let mut head = vec![
        Span::raw(if selected { "› " } else { "  " }),
        Span::styled(format!("{:<22}", field.label()), label_style),
    ];

    let editing = match &state.input {
        Input::Edit { field: f, buffer } if *f == field => Some(buffer.as_str()),
        _ => None,
    };

    let form = &state.form;
    let (setting, options) = match field {
        Field::Interface => (Some(&form.interface), state.interface_options.len()),
        Field::Target => (Some(&form.target), state.target_options.len()),
        Field::Port(p) => (Some(form.port(p)), 0),
        _ => (None, 0),
    };
    let items: &[String] = match field {
        Field::CustomConfigs => &form.custom_configs,
        Field::PreCmds => &form.pre_cmds,
        Field::PostCmds => &form.custom_cmds,
        _ => &[],
    };

    if field == Field::Profile {
        head.push(Span::raw(state.store.current_name().to_string()));
        if state.dirty() {
            head.push(Span::styled(" (modified)", cursor));
        }
        if selected {
            head.push(Span::styled("  ←/→", hint));
        }
        return vec![Line::from(head)];
    }

    if field.is_list() {
        let mut rows: Vec<Vec<Span<'static>>> = items
            .iter()
            .map(|item| vec![Span::raw(item.clone())])
            .collect();
        if let Some(buf) = editing {
            rows.push(vec![Span::styled(format!("+ {buf}▏"), cursor)]);
        }
        if rows.is_empty() {
            rows.push(vec![Span::raw("-")]);
        }
        let mut rows = rows.into_iter();
        head.extend(rows.next().unwrap_or_default());
        let mut lines = vec![Line::from(head)];
        for row in rows {
            let mut spans = vec![Span::raw(" ".repeat(LABEL_WIDTH))];
            spans.extend(row);
            lines.push(Line::from(spans));
        }
        return lines;
    }

    match (editing, setting) {
        (Some(buf), _) => head.push(Span::styled(format!("{buf}▏"), cursor)),
        (None, Some(setting)) => head.extend(setting_spans(setting)),
        (None, None) if form.openocd_path.is_empty() => head.push(Span::raw("-")),
        (None, None) => head.push(Span::raw(form.openocd_path.clone())),
    }
    if selected && options > 0 {
        head.push(Span::styled(format!("  ({options} options, ←/→)"), hint));
    }
    vec![Line::from(head)]
}

fn draw_profile(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(area);

    let mut lines = Vec::new();
    for (i, field) in Field::ALL.iter().enumerate() {
        lines.extend(field_lines(state, *field, i == state.selected));
    }
    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Configuration"),
    );
    f.render_widget(form, cols[0]);

    let preview = match build_command(&state.form) {
        Ok(cmd) => {
            let mut lines = vec![Line::from(Span::styled(
                cmd.program.display().to_string(),
                Style::default().fg(Color::Cyan),
            ))];
            lines.extend(cmd.args.iter().map(|a| Line::from(format!("  {a}"))));
            lines
        }
        Err(e) => vec![Line::from(Span::styled(
            e.to_string(),
            Style::default().fg(Color::Red),
        ))],
    };
    let preview = Paragraph::new(preview)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Command"));
    f.render_widget(preview, cols[1]);
}

fn draw_output(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // Borders take two rows
    let visible = area.height.saturating_sub(2) as usize;
    let end = state.output.len().saturating_sub(state.output_scroll);
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = state.output[start..end]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();

    let mut title = vec![Span::raw("OpenOCD Output")];
    if let Some(cmd) = state.last_command.as_deref() {
        title.push(Span::styled(format!(": {cmd}"), Style::default().fg(Color::DarkGray)));
    }
    if state.output_scroll > 0 {
        title.push(Span::styled(
            format!(" (scrolled back {})", state.output_scroll),
            Style::default().fg(Color::Yellow),
        ));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Line::from(title)),
    );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let line = match &state.input {
        Input::SaveAs { buffer } => Line::from(vec![
            Span::styled("Save as: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{buffer}▏"), Style::default().fg(Color::Yellow)),
            Span::styled(
                "  (enter to save, esc to cancel)",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        _ => {
            let (status, style) = if state.running {
                ("RUNNING", Style::default().fg(Color::Green))
            } else {
                ("IDLE", Style::default().fg(Color::DarkGray))
            };
            Line::from(vec![
                Span::styled(status, style),
                Span::raw("  "),
                Span::styled("Info: ", Style::default().fg(Color::Gray)),
                Span::raw(state.info.clone()),
            ])
        }
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
