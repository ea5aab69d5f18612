use crate::error::StoreError;
use crate::launcher::{list_cfg_files, scripts_dir};
use crate::model::{AppEvent, Port, ProcessEvent, Profile, Setting};
use crate::store::ProfileStore;
use std::path::Path;

/// Oldest output lines are dropped beyond this.
pub const OUTPUT_MAX: usize = 5000;

pub const TAB_PROFILE: usize = 0;
pub const TAB_OUTPUT: usize = 1;
pub const TAB_HELP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Profile,
    InstallPath,
    Interface,
    Target,
    Port(Port),
    CustomConfigs,
    PreCmds,
    PostCmds,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Profile,
        Field::InstallPath,
        Field::Interface,
        Field::Target,
        Field::Port(Port::Gdb),
        Field::Port(Port::Tcl),
        Field::Port(Port::Telnet),
        Field::CustomConfigs,
        Field::PreCmds,
        Field::PostCmds,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Profile => "Configuration",
            Field::InstallPath => "OpenOCD Folder",
            Field::Interface => "Interface",
            Field::Target => "Target",
            Field::Port(p) => p.label(),
            Field::CustomConfigs => "Custom Config Files",
            Field::PreCmds => "Pre-Launch Commands",
            Field::PostCmds => "Post-Launch Commands",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            Field::CustomConfigs | Field::PreCmds | Field::PostCmds
        )
    }
}

/// What keystrokes currently feed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Normal,
    /// Editing a text field, or appending to a list field.
    Edit { field: Field, buffer: String },
    /// Typing a name for "save as".
    SaveAs { buffer: String },
}

pub struct UiState {
    pub tab: usize,
    pub store: ProfileStore,
    /// Working copy of the current profile; saved explicitly.
    pub form: Profile,
    pub selected: usize,
    pub input: Input,
    pub interface_options: Vec<String>,
    pub target_options: Vec<String>,
    pub output: Vec<String>,
    /// Lines scrolled up from the bottom of the output pane.
    pub output_scroll: usize,
    pub running: bool,
    pub info: String,
    pub last_command: Option<String>,
}

/// Local wall-clock time for output markers.
fn clock() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

impl UiState {
    pub fn new(store: ProfileStore) -> Self {
        let form = store.current();
        let mut state = Self {
            tab: TAB_PROFILE,
            store,
            form,
            selected: 0,
            input: Input::Normal,
            interface_options: Vec::new(),
            target_options: Vec::new(),
            output: Vec::new(),
            output_scroll: 0,
            running: false,
            info: String::new(),
            last_command: None,
        };
        state.refresh_options();
        state
    }

    pub fn field(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(Field::ALL.len() - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// True when the form differs from what is stored under the current name.
    pub fn dirty(&self) -> bool {
        self.form != self.store.current()
    }

    fn setting_mut(&mut self, field: Field) -> Option<&mut Setting> {
        match field {
            Field::Interface => Some(&mut self.form.interface),
            Field::Target => Some(&mut self.form.target),
            Field::Port(p) => Some(self.form.port_mut(p)),
            _ => None,
        }
    }

    fn list_mut(&mut self, field: Field) -> Option<&mut Vec<String>> {
        match field {
            Field::CustomConfigs => Some(&mut self.form.custom_configs),
            Field::PreCmds => Some(&mut self.form.pre_cmds),
            Field::PostCmds => Some(&mut self.form.custom_cmds),
            _ => None,
        }
    }

    /// Rescan interface/target options from the install dir's scripts directory.
    pub fn refresh_options(&mut self) {
        self.interface_options.clear();
        self.target_options.clear();
        let install = self.form.openocd_path.trim();
        if install.is_empty() {
            return;
        }
        let scripts = scripts_dir(Path::new(install));
        if !scripts.is_dir() {
            self.info = format!("Scripts directory missing: {}", scripts.display());
            return;
        }
        self.interface_options = list_cfg_files(&scripts, "interface");
        self.target_options = list_cfg_files(&scripts, "target");
        tracing::debug!(
            interfaces = self.interface_options.len(),
            targets = self.target_options.len(),
            "scanned scripts directory"
        );
    }

    /// Switch to a stored profile, discarding unsaved edits.
    pub fn load_profile(&mut self, name: &str) {
        if self.store.select(name) {
            self.form = self.store.current();
            self.info = format!("Loaded configuration '{name}'");
            self.refresh_options();
        }
    }

    pub fn cycle_profile(&mut self, forward: bool) {
        let names = self.store.list_names();
        let Some(pos) = names.iter().position(|n| n == self.store.current_name()) else {
            return;
        };
        let next = if forward {
            (pos + 1) % names.len()
        } else {
            (pos + names.len() - 1) % names.len()
        };
        let name = names[next].clone();
        self.load_profile(&name);
    }

    /// Step through scanned options for the interface/target field.
    pub fn cycle_option(&mut self, forward: bool) {
        let field = self.field();
        let options = match field {
            Field::Interface => self.interface_options.clone(),
            Field::Target => self.target_options.clone(),
            _ => return,
        };
        if options.is_empty() {
            self.info = format!("No {} options found", field.label().to_lowercase());
            return;
        }
        let Some(setting) = self.setting_mut(field) else {
            return;
        };
        let next = match options.iter().position(|o| *o == setting.value) {
            Some(pos) if forward => (pos + 1) % options.len(),
            Some(pos) => (pos + options.len() - 1) % options.len(),
            None if forward => 0,
            None => options.len() - 1,
        };
        setting.value = options[next].clone();
        setting.enabled = true;
    }

    pub fn cycle(&mut self, forward: bool) {
        match self.field() {
            Field::Profile => self.cycle_profile(forward),
            Field::Interface | Field::Target => self.cycle_option(forward),
            _ => {}
        }
    }

    pub fn toggle_enabled(&mut self) {
        let field = self.field();
        if let Some(setting) = self.setting_mut(field) {
            setting.enabled = !setting.enabled;
        }
    }

    pub fn begin_edit(&mut self) {
        let field = self.field();
        let buffer = match field {
            Field::Profile => {
                self.info = "Use ←/→ to switch configurations, n to save as a new one".into();
                return;
            }
            Field::InstallPath => self.form.openocd_path.clone(),
            f if f.is_list() => String::new(),
            f => self
                .setting_mut(f)
                .map(|s| s.value.clone())
                .unwrap_or_default(),
        };
        self.input = Input::Edit { field, buffer };
    }

    pub fn begin_save_as(&mut self) {
        self.input = Input::SaveAs {
            buffer: String::new(),
        };
    }

    pub fn cancel_input(&mut self) {
        self.input = Input::Normal;
    }

    pub fn input_char(&mut self, c: char) {
        match &mut self.input {
            Input::Edit { buffer, .. } | Input::SaveAs { buffer } => buffer.push(c),
            Input::Normal => {}
        }
    }

    pub fn input_backspace(&mut self) {
        match &mut self.input {
            Input::Edit { buffer, .. } | Input::SaveAs { buffer } => {
                buffer.pop();
            }
            Input::Normal => {}
        }
    }

    pub fn commit_input(&mut self) {
        match std::mem::replace(&mut self.input, Input::Normal) {
            Input::Normal => {}
            Input::Edit { field, buffer } => self.commit_edit(field, buffer),
            Input::SaveAs { buffer } => self.save_as(&buffer),
        }
    }

    fn commit_edit(&mut self, field: Field, buffer: String) {
        match field {
            Field::Profile => {}
            Field::InstallPath => {
                self.form.openocd_path = buffer.trim().to_string();
                self.refresh_options();
            }
            f if f.is_list() => {
                let item = buffer.trim().to_string();
                if let (false, Some(list)) = (item.is_empty(), self.list_mut(f)) {
                    list.push(item);
                }
            }
            f => {
                if let Some(setting) = self.setting_mut(f) {
                    *setting = Setting::new(buffer.trim());
                }
            }
        }
    }

    pub fn remove_last_item(&mut self) {
        let field = self.field();
        if let Some(list) = self.list_mut(field) {
            if let Some(removed) = list.pop() {
                self.info = format!("Removed '{removed}'");
            }
        }
    }

    pub fn save(&mut self) {
        let name = self.store.current_name().to_string();
        match self.store.save(&name, self.form.clone()) {
            Ok(()) => self.info = format!("Configuration '{name}' saved."),
            Err(e) => self.info = format!("Save failed: {e}"),
        }
    }

    fn save_as(&mut self, name: &str) {
        match self.store.save_as(name, self.form.clone()) {
            Ok(()) => {
                self.info = format!("Configuration '{}' saved.", self.store.current_name());
            }
            Err(e @ (StoreError::DuplicateName(_) | StoreError::BlankName)) => {
                self.info = format!("{e}; pick another name");
            }
            Err(e) => self.info = format!("Save failed: {e}"),
        }
    }

    pub fn push_output(&mut self, line: String) {
        self.output.push(line);
        if self.output_scroll > 0 {
            // Keep the viewport anchored while scrolled back
            self.output_scroll += 1;
        }
        if self.output.len() > OUTPUT_MAX {
            let excess = self.output.len() - OUTPUT_MAX;
            let _ = self.output.drain(0..excess);
        }
        self.output_scroll = self.output_scroll.min(self.output.len());
    }

    pub fn scroll_output(&mut self, up: isize) {
        let max = self.output.len();
        self.output_scroll = (self.output_scroll as isize + up).clamp(0, max as isize) as usize;
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
        self.output_scroll = 0;
    }

    pub fn apply_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Started { command, pid } => {
                self.running = true;
                self.push_output(format!("[{}] Running: {command}", clock()));
                self.info = match pid {
                    Some(pid) => format!("OpenOCD started (pid {pid})"),
                    None => "OpenOCD started".into(),
                };
                self.last_command = Some(command);
                self.tab = TAB_OUTPUT;
                self.output_scroll = 0;
            }
            AppEvent::Process(ProcessEvent::Line(line)) => self.push_output(line),
            AppEvent::Process(ProcessEvent::Exited { code }) => {
                self.running = false;
                let shown = code.map_or_else(|| "by signal".to_string(), |c| c.to_string());
                self.push_output(format!("[{}] Exited {shown}", clock()));
                self.info = format!("OpenOCD exited {shown}");
            }
            AppEvent::Info(msg) => self.info = msg,
        }
    }
}
