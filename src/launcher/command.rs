//! OpenOCD command line construction.

use crate::error::LaunchError;
use crate::model::{Port, Profile};
use std::path::{Path, PathBuf};

/// Scripts directory candidates relative to the install dir, in preference order.
const SCRIPTS_DIRS: [&str; 3] = ["share/openocd/scripts", "openocd/scripts", "scripts"];

/// A fully resolved invocation: program plus arguments in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Single-line rendering for display, quoting arguments that contain whitespace.
    pub fn display(&self) -> String {
        self.argv()
            .iter()
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) {
                    format!("\"{}\"", a.replace('"', "\\\""))
                } else {
                    a.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Locate the `openocd` executable under an install dir.
pub fn resolve_executable(install_dir: &Path) -> Result<PathBuf, LaunchError> {
    if !install_dir.is_dir() {
        return Err(LaunchError::InvalidInstallDir(install_dir.to_path_buf()));
    }
    for base in [install_dir.join("openocd"), install_dir.join("bin").join("openocd")] {
        if base.is_file() {
            return Ok(base);
        }
        let exe = base.with_extension("exe");
        if exe.is_file() {
            return Ok(exe);
        }
    }
    Err(LaunchError::ExecutableNotFound(install_dir.to_path_buf()))
}

/// Scripts directory passed with `-s`. Falls back to the standard layout when
/// none of the candidates exist.
pub fn scripts_dir(install_dir: &Path) -> PathBuf {
    SCRIPTS_DIRS
        .iter()
        .map(|rel| install_dir.join(rel))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| install_dir.join(SCRIPTS_DIRS[0]))
}

/// Normalize one command line: trimmed, with a redundant leading `-c ` removed.
fn command_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let line = line.strip_prefix("-c ").map(str::trim_start).unwrap_or(line);
    Some(line.to_string())
}

fn push_commands(args: &mut Vec<String>, lines: &[String]) {
    for line in lines.iter().filter_map(|l| command_line(l)) {
        args.push("-c".into());
        args.push(line);
    }
}

/// Build the OpenOCD invocation for a profile.
///
/// Flag order matters to OpenOCD: pre-launch commands, ports, scripts dir, interface,
/// target, custom configs, post-launch commands.
pub fn build_command(profile: &Profile) -> Result<LaunchCommand, LaunchError> {
    let install_dir = PathBuf::from(profile.openocd_path.trim());
    let program = resolve_executable(&install_dir)?;
    let mut args = Vec::new();

    push_commands(&mut args, &profile.pre_cmds);

    for port in Port::ALL {
        if let Some(value) = profile.port(port).active() {
            args.push("-c".into());
            args.push(format!("{} {}", port.command(), value));
        }
    }

    args.push("-s".into());
    args.push(scripts_dir(&install_dir).to_string_lossy().into_owned());

    if let Some(name) = profile.interface.active() {
        args.push("-f".into());
        args.push(format!("interface/{name}.cfg"));
    }
    if let Some(name) = profile.target.active() {
        args.push("-f".into());
        args.push(format!("target/{name}.cfg"));
    }
    for cfg in profile.custom_configs.iter().map(|c| c.trim()) {
        if !cfg.is_empty() {
            args.push("-f".into());
            args.push(cfg.to_string());
        }
    }

    push_commands(&mut args, &profile.custom_cmds);

    tracing::debug!(program = %program.display(), ?args, "built launch command");
    Ok(LaunchCommand { program, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Setting;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn install_dir(exe_rel: &str, scripts_rel: Option<&str>) -> PathBuf {
        static N: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "openocd-launcher-cmd-{}-{}",
            std::process::id(),
            N.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&dir);
        let exe = dir.join(exe_rel);
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, b"").unwrap();
        if let Some(rel) = scripts_rel {
            fs::create_dir_all(dir.join(rel)).unwrap();
        }
        dir
    }

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_reference_invocation() {
        let dir = install_dir("bin/openocd", Some("share/openocd/scripts"));
        let profile = Profile {
            openocd_path: dir.to_string_lossy().into_owned(),
            interface: Setting::new("ftdi"),
            gdb_port: Setting::new("3333"),
            pre_cmds: strs(&["init"]),
            ..Default::default()
        };
        let cmd = build_command(&profile).unwrap();
        assert_eq!(cmd.program, dir.join("bin").join("openocd"));
        let scripts = dir.join("share/openocd/scripts").to_string_lossy().into_owned();
        assert_eq!(
            cmd.args,
            strs(&[
                "-c",
                "init",
                "-c",
                "gdb_port 3333",
                "-s",
                &scripts,
                "-f",
                "interface/ftdi.cfg"
            ])
        );
    }

    #[test]
    fn full_profile_emits_flags_in_order() {
        let dir = install_dir("openocd", None);
        let profile = Profile {
            openocd_path: dir.to_string_lossy().into_owned(),
            interface: Setting::new("stlink"),
            target: Setting::new("stm32f4x"),
            gdb_port: Setting::new("3333"),
            tcl_port: Setting::new("6666"),
            telnet_port: Setting::new("4444"),
            custom_configs: strs(&["/b/one.cfg", " ", "/b/two.cfg"]),
            pre_cmds: strs(&["bindto 0.0.0.0", "", "-c adapter speed 4000"]),
            custom_cmds: strs(&["init", "  reset halt  "]),
        };
        let cmd = build_command(&profile).unwrap();
        let scripts = dir.join("share/openocd/scripts").to_string_lossy().into_owned();
        assert_eq!(
            cmd.args,
            strs(&[
                "-c",
                "bindto 0.0.0.0",
                "-c",
                "adapter speed 4000",
                "-c",
                "gdb_port 3333",
                "-c",
                "tcl_port 6666",
                "-c",
                "telnet_port 4444",
                "-s",
                &scripts,
                "-f",
                "interface/stlink.cfg",
                "-f",
                "target/stm32f4x.cfg",
                "-f",
                "/b/one.cfg",
                "-f",
                "/b/two.cfg",
                "-c",
                "init",
                "-c",
                "reset halt",
            ])
        );
    }

    #[test]
    fn disabled_settings_are_omitted() {
        let dir = install_dir("openocd", None);
        let profile = Profile {
            openocd_path: dir.to_string_lossy().into_owned(),
            interface: Setting::disabled("ftdi"),
            target: Setting::new("   "),
            gdb_port: Setting::disabled("3333"),
            ..Default::default()
        };
        let cmd = build_command(&profile).unwrap();
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0], "-s");
    }

    #[test]
    fn build_is_order_stable() {
        let dir = install_dir("bin/openocd", None);
        let profile = Profile {
            openocd_path: dir.to_string_lossy().into_owned(),
            target: Setting::new("nrf52"),
            telnet_port: Setting::new("4444"),
            custom_configs: strs(&["a.cfg", "b.cfg"]),
            custom_cmds: strs(&["init", "halt"]),
            ..Default::default()
        };
        let first = build_command(&profile).unwrap();
        let second = build_command(&profile).unwrap();
        assert_eq!(first.argv(), second.argv());
    }

    #[test]
    fn prefers_root_executable_over_bin() {
        let dir = install_dir("openocd", None);
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(dir.join("bin").join("openocd"), b"").unwrap();
        assert_eq!(resolve_executable(&dir).unwrap(), dir.join("openocd"));
    }

    #[test]
    fn finds_exe_suffix_variant() {
        let dir = install_dir("bin/openocd.exe", None);
        assert_eq!(
            resolve_executable(&dir).unwrap(),
            dir.join("bin").join("openocd.exe")
        );
    }

    #[test]
    fn missing_executable_is_reported() {
        let dir = install_dir("bin/not-openocd", None);
        let profile = Profile {
            openocd_path: dir.to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert!(matches!(
            build_command(&profile),
            Err(LaunchError::ExecutableNotFound(_))
        ));
    }

    #[test]
    fn invalid_install_dir_is_reported() {
        let profile = Profile {
            openocd_path: "/definitely/not/here/openocd-launcher".into(),
            ..Default::default()
        };
        assert!(matches!(
            build_command(&profile),
            Err(LaunchError::InvalidInstallDir(_))
        ));
        let blank = Profile::default();
        assert!(matches!(
            build_command(&blank),
            Err(LaunchError::InvalidInstallDir(_))
        ));
    }

    #[test]
    fn scripts_dir_falls_back_through_layouts() {
        let dir = install_dir("openocd", Some("scripts"));
        assert_eq!(scripts_dir(&dir), dir.join("scripts"));
        fs::create_dir_all(dir.join("openocd/scripts")).unwrap();
        assert_eq!(scripts_dir(&dir), dir.join("openocd/scripts"));
        fs::create_dir_all(dir.join("share/openocd/scripts")).unwrap();
        assert_eq!(scripts_dir(&dir), dir.join("share/openocd/scripts"));
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let cmd = LaunchCommand {
            program: PathBuf::from("/opt/oocd/bin/openocd"),
            args: strs(&["-c", "gdb_port 3333", "-f", "interface/ftdi.cfg"]),
        };
        assert_eq!(
            cmd.display(),
            "/opt/oocd/bin/openocd -c \"gdb_port 3333\" -f interface/ftdi.cfg"
        );
    }
}
