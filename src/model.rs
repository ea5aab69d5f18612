use serde::{Deserialize, Serialize};

/// A string field that can be switched off without losing its value.
///
/// Persisted as a bare string; `enabled` is derived from non-emptiness when read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Setting {
    pub value: String,
    pub enabled: bool,
}

impl Setting {
    pub fn new(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    pub fn disabled(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            enabled: false,
        }
    }

    /// Trimmed value if the setting is switched on and non-blank.
    pub fn active(&self) -> Option<&str> {
        let v = self.value.trim();
        if self.enabled && !v.is_empty() {
            Some(v)
        } else {
            None
        }
    }
}

impl From<String> for Setting {
    fn from(value: String) -> Self {
        let enabled = !value.trim().is_empty();
        Self { value, enabled }
    }
}

impl From<Setting> for String {
    fn from(s: Setting) -> Self {
        s.value
    }
}

/// A named bundle of OpenOCD launch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub openocd_path: String,
    pub interface: Setting,
    pub target: Setting,
    pub gdb_port: Setting,
    pub tcl_port: Setting,
    pub telnet_port: Setting,
    pub custom_configs: Vec<String>,
    pub pre_cmds: Vec<String>,
    /// Post-launch commands. The key name is kept for compatibility with existing files.
    pub custom_cmds: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Gdb,
    Tcl,
    Telnet,
}

impl Port {
    /// Fixed emission order for command construction.
    pub const ALL: [Port; 3] = [Port::Gdb, Port::Tcl, Port::Telnet];

    /// OpenOCD command name, e.g. `gdb_port`.
    pub fn command(self) -> &'static str {
        match self {
            Port::Gdb => "gdb_port",
            Port::Tcl => "tcl_port",
            Port::Telnet => "telnet_port",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Port::Gdb => "GDB Port",
            Port::Tcl => "Tcl Port",
            Port::Telnet => "Telnet Port",
        }
    }
}

impl Profile {
    pub fn port(&self, port: Port) -> &Setting {
        match port {
            Port::Gdb => &self.gdb_port,
            Port::Tcl => &self.tcl_port,
            Port::Telnet => &self.telnet_port,
        }
    }

    pub fn port_mut(&mut self, port: Port) -> &mut Setting {
        match port {
            Port::Gdb => &mut self.gdb_port,
            Port::Tcl => &mut self.tcl_port,
            Port::Telnet => &mut self.telnet_port,
        }
    }
}

/// Output of a supervised OpenOCD process, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of merged stdout/stderr, without the trailing newline.
    Line(String),
    /// Final event. `None` when the process was terminated by a signal.
    Exited { code: Option<i32> },
}

/// Events delivered from the controller to presentation layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A launch succeeded; `command` is the rendered command line.
    Started { command: String, pid: Option<u32> },
    Process(ProcessEvent),
    Info(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let p: Profile = serde_json::from_str(r#"{"openocd_path": "/opt/oocd"}"#).unwrap();
        assert_eq!(p.openocd_path, "/opt/oocd");
        assert_eq!(p.interface, Setting::default());
        assert!(p.custom_configs.is_empty());
        assert!(p.custom_cmds.is_empty());
    }

    #[test]
    fn settings_are_stored_as_plain_strings() {
        let p = Profile {
            gdb_port: Setting::new("3333"),
            tcl_port: Setting::disabled("6666"),
            ..Default::default()
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["gdb_port"], "3333");
        assert_eq!(v["tcl_port"], "6666");
        assert_eq!(v["telnet_port"], "");
    }

    #[test]
    fn enabled_flag_follows_value_when_read() {
        let p: Profile =
            serde_json::from_str(r#"{"interface": "ftdi", "target": "  "}"#).unwrap();
        assert!(p.interface.enabled);
        assert!(!p.target.enabled);
        assert_eq!(p.interface.active(), Some("ftdi"));
        assert_eq!(p.target.active(), None);
    }

    #[test]
    fn disabled_setting_is_not_active() {
        assert_eq!(Setting::disabled("4444").active(), None);
        assert_eq!(Setting::new(" 4444 ").active(), Some("4444"));
    }
}
