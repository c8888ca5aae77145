/// Fixed-text templates for the two installed artifacts, plus the
/// placeholder substitution that fills them.
///
/// Placeholders use the `{name}` form. Substitution is literal — no
/// conditionals, no loops, no escaping. A placeholder left unfilled after
/// substitution is an error so template edits can't silently ship a
/// half-rendered artifact.

/// Shell watchdog that relaunches the supervised executable when it is not
/// running. The 30-second re-check cadence is part of the artifact contract.
pub const WATCHDOG_SCRIPT: &str = r#"#!/bin/bash
APP_NAME="{app_path}"

while true; do
    if ! pgrep -f "$APP_NAME" > /dev/null; then
        echo "$(date): supervised process not running, relaunching..."
        nohup "$APP_NAME" &
    fi
    sleep 30
done
"#;

/// launchd property list registering the watchdog script as a login agent
/// that the OS keeps alive.
pub const LAUNCH_AGENT_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{script_path}</string>
    </array>
    <key>KeepAlive</key>
    <true/>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#;

/// Errors produced by template rendering.
#[derive(Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{name}` placeholder had no matching substitution.
    Unresolved { name: String },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::Unresolved { name } => {
                write!(f, "unresolved template placeholder {{{name}}}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Substitute `{name}` placeholders in `template` with the paired values.
///
/// Brace runs that are not well-formed placeholders (empty, or containing
/// anything but lowercase ASCII and underscores) pass through as literal
/// text. Substituted values are not re-scanned.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                match substitutions.iter().find(|(n, _)| *n == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        return Err(TemplateError::Unresolved {
                            name: name.to_string(),
                        })
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}
