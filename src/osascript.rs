//! `EditorPort` backed by `osascript`.
//!
//! Each call becomes one short AppleScript program addressed to the configured
//! application (or to System Events for menu and keyboard driven steps). The only
//! thing that comes back is the process exit status.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use crate::errors::{BatchError, Result};
use crate::traits::{EditorCommand, EditorPort};

const OSASCRIPT: &str = "osascript";

#[derive(Debug, Clone)]
pub struct OsaScriptEditor {
    app_name: String,
}

impl OsaScriptEditor {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn run(&self, operation: &str, script: &str) -> Result<bool> {
        trace!(operation, script, "running osascript");
        let output = Command::new(OSASCRIPT)
            .arg("-e")
            .arg(script)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BatchError::Dispatch {
                operation: operation.to_string(),
                source,
            })?;

        if !output.status.success() {
            debug!(
                operation,
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "osascript reported failure"
            );
        }
        Ok(output.status.success())
    }
}

impl EditorPort for OsaScriptEditor {
    fn activate(&mut self) -> Result<bool> {
        self.run("activate", &activate_script(&self.app_name))
    }

    fn open(&mut self, path: &Path) -> Result<bool> {
        self.run("open", &open_script(&self.app_name, path))
    }

    fn issue(&mut self, command: &EditorCommand) -> Result<bool> {
        self.run(command.name(), &command_script(&self.app_name, command))
    }

    fn close(&mut self, saving_changes: bool) -> Result<bool> {
        self.run("close", &close_script(&self.app_name, saving_changes))
    }
}

/// Quote `value` as an AppleScript string literal.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn posix_file(path: &Path) -> String {
    format!("POSIX file {}", quote(&path.to_string_lossy()))
}

pub fn activate_script(app: &str) -> String {
    format!("tell application {} to activate", quote(app))
}

pub fn open_script(app: &str, path: &Path) -> String {
    format!(
        "set inputFile to ({}) as string\n\
         tell application {}\n\
         \tactivate\n\
         \topen file inputFile\n\
         end tell",
        posix_file(path),
        quote(app)
    )
}

pub fn close_script(app: &str, saving_changes: bool) -> String {
    let saving = if saving_changes { "yes" } else { "no" };
    format!(
        "tell application {}\n\tclose current document saving {}\nend tell",
        quote(app),
        saving
    )
}

/// Click `item` in the menu bar menu `menu` of the application process.
fn menu_click(app: &str, menu: &str, item: &str) -> String {
    format!(
        "tell application \"System Events\"\n\
         \ttell process {}\n\
         \t\tclick menu item {} of menu {} of menu bar item {} of menu bar 1\n\
         \tend tell\n\
         end tell",
        quote(app),
        quote(item),
        quote(menu),
        quote(menu)
    )
}

fn keyboard(app: &str, keys: &str) -> String {
    format!(
        "tell application \"System Events\"\n\
         \ttell process {}\n\
         \t\t{}\n\
         \tend tell\n\
         end tell",
        quote(app),
        keys
    )
}

pub fn command_script(app: &str, command: &EditorCommand) -> String {
    match command {
        EditorCommand::NormalizeBackgroundLayer => format!(
            "tell application {}\n\
             \ttell current document\n\
             \t\tif exists background layer then\n\
             \t\t\tset background layer's name to \"Layer 0\"\n\
             \t\tend if\n\
             \tend tell\n\
             end tell",
            quote(app)
        ),
        EditorCommand::SelectSubject => menu_click(app, "Select", "Subject"),
        EditorCommand::InvertSelection => menu_click(app, "Select", "Inverse"),
        // 51 is the Delete key
        EditorCommand::DeleteSelection => keyboard(app, "key code 51"),
        EditorCommand::Deselect => keyboard(app, "keystroke \"d\" using command down"),
        EditorCommand::Trim => format!(
            "tell application \"System Events\"\n\
             \ttell process {}\n\
             \t\tclick menu item \"Trim...\" of menu \"Image\" of menu bar item \"Image\" of menu bar 1\n\
             \t\tdelay 0.5\n\
             \t\tkeystroke return\n\
             \tend tell\n\
             end tell",
            quote(app)
        ),
        EditorCommand::ExportPng { destination } => format!(
            "set outputFile to ({}) as string\n\
             tell application {}\n\
             \ttell current document\n\
             \t\tset pngOptions to {{class:PNG save options, compression:6}}\n\
             \t\tsave in file outputFile as PNG with options pngOptions with copying\n\
             \tend tell\n\
             end tell",
            posix_file(destination),
            quote(app)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const APP: &str = "Adobe Photoshop 2025";

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote(r#"my "best" shot"#), r#""my \"best\" shot""#);
        assert_eq!(quote(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn test_open_script_uses_posix_path() {
        let script = open_script(APP, Path::new("/Users/me/Photos/a b.jpg"));
        assert!(script.contains("POSIX file \"/Users/me/Photos/a b.jpg\""));
        assert!(script.contains("tell application \"Adobe Photoshop 2025\""));
        assert!(script.contains("open file inputFile"));
    }

    #[test]
    fn test_close_script_saving_flag() {
        assert!(close_script(APP, false).contains("saving no"));
        assert!(close_script(APP, true).contains("saving yes"));
    }

    #[test]
    fn test_menu_commands_target_process() {
        let script = command_script(APP, &EditorCommand::SelectSubject);
        assert!(script.contains("tell process \"Adobe Photoshop 2025\""));
        assert!(script.contains(
            "click menu item \"Subject\" of menu \"Select\" of menu bar item \"Select\""
        ));

        let script = command_script(APP, &EditorCommand::InvertSelection);
        assert!(script.contains("menu item \"Inverse\""));
    }

    #[test]
    fn test_export_script() {
        let script = command_script(
            APP,
            &EditorCommand::ExportPng {
                destination: PathBuf::from("/out/a.png"),
            },
        );
        assert!(script.contains("POSIX file \"/out/a.png\""));
        assert!(script.contains("{class:PNG save options, compression:6}"));
        assert!(script.contains("with copying"));
    }

    #[test]
    fn test_app_name_is_quoted() {
        let script = activate_script("Odd \"Editor\"");
        assert_eq!(script, "tell application \"Odd \\\"Editor\\\"\" to activate");
    }
}
