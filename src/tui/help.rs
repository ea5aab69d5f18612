use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key(keys: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{keys:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key("q / Ctrl-C", "Quit (stops OpenOCD first)"),
        key("r", "Run OpenOCD with the current form"),
        key("t", "Terminate the running OpenOCD"),
        key("s", "Save the form under the current configuration"),
        key("n", "Save the form as a new configuration"),
        key("y", "Copy the command line to clipboard"),
        key("tab", "Switch tabs"),
        key("?", "Show this help"),
        Line::from(""),
        Line::from("Profile tab:"),
        key("↑/↓ or j/k", "Select field"),
        key("enter", "Edit field, or append to a list"),
        key("space", "Toggle whether interface/target/port is used"),
        key("←/→", "Switch configuration, or cycle scanned options"),
        key("x", "Remove the last list entry"),
        key("esc", "Cancel editing"),
        Line::from(""),
        Line::from("Output tab:"),
        key("↑/↓ or j/k", "Scroll"),
        key("pgup/pgdn", "Scroll a page"),
        key("end", "Follow new output"),
        key("w", "Write output to a log file"),
        key("c", "Clear output"),
        Line::from(""),
        Line::from("Interface and target options are read from the scripts directory"),
        Line::from("of the OpenOCD folder (share/openocd/scripts)."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
