/// System-control capability: the three OS side effects the guard performs.
///
/// The real implementation shells out to `networksetup` and `launchctl`.
/// The installer and the monitor loop only see the trait, so tests run
/// against fakes instead of the live utilities.
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Errors from invoking the external system utilities.
#[derive(Debug)]
pub enum ControlError {
    /// The utility could not be spawned at all (missing binary, etc.).
    Spawn {
        command: String,
        source: std::io::Error,
    },
    /// The utility ran but exited unsuccessfully.
    Failed {
        command: String,
        code: Option<i32>,
    },
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::Spawn { command, source } => {
                write!(f, "failed to run {command}: {source}")
            }
            ControlError::Failed { command, code } => match code {
                Some(code) => write!(f, "{command} exited with status {code}"),
                None => write!(f, "{command} was terminated by a signal"),
            },
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Spawn { source, .. } => Some(source),
            ControlError::Failed { .. } => None,
        }
    }
}

/// OS operations the guard depends on.
pub trait SystemControl {
    /// Whether the wireless interface is currently powered on.
    fn interface_power(&self) -> Result<bool, ControlError>;

    /// Power the wireless interface on or off.
    fn set_interface_power(&self, on: bool) -> Result<(), ControlError>;

    /// Register a launch agent descriptor with the service manager.
    fn register_agent(&self, descriptor: &Path) -> Result<(), ControlError>;
}

/// Parse the free-text power report from `networksetup -getairportpower`.
///
/// The tool prints a line like `Wi-Fi Power (en0): On`; the powered-on state
/// is a substring match, as the output format carries no structure.
pub fn power_state_from_output(output: &str) -> bool {
    output.contains("On")
}

/// `SystemControl` backed by the macOS command-line utilities.
pub struct MacosSystemControl {
    interface: String,
}

impl MacosSystemControl {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

impl SystemControl for MacosSystemControl {
    fn interface_power(&self) -> Result<bool, ControlError> {
        let command = format!("networksetup -getairportpower {}", self.interface);
        let output = Command::new("networksetup")
            .args(["-getairportpower", &self.interface])
            .output()
            .map_err(|e| ControlError::Spawn {
                command: command.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(ControlError::Failed {
                command,
                code: output.status.code(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(interface = %self.interface, report = %stdout.trim(), "queried interface power");
        Ok(power_state_from_output(&stdout))
    }

    fn set_interface_power(&self, on: bool) -> Result<(), ControlError> {
        let directive = if on { "on" } else { "off" };
        let command = format!(
            "networksetup -setairportpower {} {directive}",
            self.interface
        );
        debug!(interface = %self.interface, directive, "setting interface power");
        let status = Command::new("networksetup")
            .args(["-setairportpower", &self.interface, directive])
            .status()
            .map_err(|e| ControlError::Spawn {
                command: command.clone(),
                source: e,
            })?;
        if !status.success() {
            return Err(ControlError::Failed {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }

    fn register_agent(&self, descriptor: &Path) -> Result<(), ControlError> {
        let command = format!("launchctl load {}", descriptor.display());
        debug!(descriptor = %descriptor.display(), "registering launch agent");
        let status = Command::new("launchctl")
            .arg("load")
            .arg(descriptor)
            .status()
            .map_err(|e| ControlError::Spawn {
                command: command.clone(),
                source: e,
            })?;
        if !status.success() {
            return Err(ControlError::Failed {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powered_on_report_parses_as_on() {
        assert!(power_state_from_output("Wi-Fi Power (en0): On\n"));
    }

    #[test]
    fn powered_off_report_parses_as_off() {
        assert!(!power_state_from_output("Wi-Fi Power (en0): Off\n"));
    }

    #[test]
    fn empty_or_unrelated_output_parses_as_off() {
        assert!(!power_state_from_output(""));
        assert!(!power_state_from_output("en0 is not a Wi-Fi interface\n"));
    }

    #[test]
    fn spawn_error_display_names_the_command() {
        let err = ControlError::Spawn {
            command: "networksetup -getairportpower en0".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let text = err.to_string();
        assert!(text.contains("networksetup -getairportpower en0"));
        assert!(text.contains("no such file"));
    }

    #[test]
    fn failed_error_display_includes_exit_code() {
        let err = ControlError::Failed {
            command: "launchctl load /tmp/agent.plist".to_string(),
            code: Some(113),
        };
        assert!(err.to_string().contains("status 113"));

        let killed = ControlError::Failed {
            command: "launchctl load /tmp/agent.plist".to_string(),
            code: None,
        };
        assert!(killed.to_string().contains("terminated by a signal"));
    }
}
