/// Installs the persistence artifacts: the watchdog script, the launch agent
/// descriptor, and the service-manager registration.
///
/// Every step is fatal on failure and nothing is rolled back; a partial
/// install (script written, agent never registered) is a possible terminal
/// state. Re-running with the same executable path rewrites identical
/// artifacts, so the install is idempotent.
use crate::config::GuardConfig;
use crate::netctl::{ControlError, SystemControl};
use crate::template::{self, TemplateError, LAUNCH_AGENT_PLIST, WATCHDOG_SCRIPT};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Owner rwx, group/other rx — the script must be executable by launchd.
const SCRIPT_MODE: u32 = 0o755;

/// Where the two artifacts land for a given configuration.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    /// `<home>/<script_name>`
    pub script: PathBuf,
    /// `<home>/Library/LaunchAgents/<label>.plist`
    pub agent: PathBuf,
}

/// Errors that abort an install.
#[derive(Debug)]
pub enum InstallError {
    /// The OS could not report this executable's path.
    ExecutablePath { source: std::io::Error },
    /// No home directory to install under.
    HomeDir,
    /// A template failed to render.
    Render { source: TemplateError },
    /// Could not create the launch agents directory.
    CreateAgentDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Could not write an artifact file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Could not mark the watchdog script executable.
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The service manager rejected the agent descriptor.
    Register { source: ControlError },
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::ExecutablePath { source } => {
                write!(f, "failed to resolve the executable path: {source}")
            }
            InstallError::HomeDir => {
                write!(f, "no home directory found to install into")
            }
            InstallError::Render { source } => {
                write!(f, "failed to render artifact template: {source}")
            }
            InstallError::CreateAgentDir { path, source } => {
                write!(
                    f,
                    "failed to create launch agents directory {}: {source}",
                    path.display()
                )
            }
            InstallError::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            InstallError::Permissions { path, source } => {
                write!(
                    f,
                    "failed to mark {} executable: {source}",
                    path.display()
                )
            }
            InstallError::Register { source } => {
                write!(f, "failed to register launch agent: {source}")
            }
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstallError::ExecutablePath { source } => Some(source),
            InstallError::HomeDir => None,
            InstallError::Render { source } => Some(source),
            InstallError::CreateAgentDir { source, .. } => Some(source),
            InstallError::Write { source, .. } => Some(source),
            InstallError::Permissions { source, .. } => Some(source),
            InstallError::Register { source } => Some(source),
        }
    }
}

/// Absolute path of the running executable — the process the watchdog
/// script supervises.
pub fn supervised_executable() -> Result<PathBuf, InstallError> {
    std::env::current_exe().map_err(|e| InstallError::ExecutablePath { source: e })
}

/// Resolve both artifact paths from the configuration.
///
/// A missing home directory is fatal here rather than degrading to paths
/// rooted at the empty string.
pub fn resolve_paths(config: &GuardConfig) -> Result<InstallPaths, InstallError> {
    let home = match &config.persistence.home_dir {
        Some(dir) => dir.clone(),
        None => dirs::home_dir().ok_or(InstallError::HomeDir)?,
    };
    let script = home.join(&config.persistence.script_name);
    let agent = home
        .join("Library")
        .join("LaunchAgents")
        .join(format!("{}.plist", config.persistence.label));
    Ok(InstallPaths { script, agent })
}

fn render_script(app_path: &Path) -> Result<String, InstallError> {
    let app = app_path.display().to_string();
    template::render(WATCHDOG_SCRIPT, &[("app_path", &app)])
        .map_err(|e| InstallError::Render { source: e })
}

fn render_agent(config: &GuardConfig, script_path: &Path) -> Result<String, InstallError> {
    let script = script_path.display().to_string();
    template::render(
        LAUNCH_AGENT_PLIST,
        &[
            ("label", config.persistence.label.as_str()),
            ("script_path", &script),
        ],
    )
    .map_err(|e| InstallError::Render { source: e })
}

/// Write both artifacts, mark the script executable, and register the agent.
///
/// `app_path` is the executable the watchdog keeps alive. Existing files at
/// the target paths are truncated, never appended to.
pub fn install<C: SystemControl>(
    config: &GuardConfig,
    control: &C,
    app_path: &Path,
) -> Result<InstallPaths, InstallError> {
    let paths = resolve_paths(config)?;

    let script = render_script(app_path)?;
    std::fs::write(&paths.script, script).map_err(|e| InstallError::Write {
        path: paths.script.clone(),
        source: e,
    })?;
    info!(path = %paths.script.display(), "wrote watchdog script");

    let agent_dir = paths.agent.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(agent_dir).map_err(|e| InstallError::CreateAgentDir {
        path: agent_dir.to_path_buf(),
        source: e,
    })?;
    let agent = render_agent(config, &paths.script)?;
    std::fs::write(&paths.agent, agent).map_err(|e| InstallError::Write {
        path: paths.agent.clone(),
        source: e,
    })?;
    info!(path = %paths.agent.display(), "wrote launch agent descriptor");

    let mut perms = std::fs::metadata(&paths.script)
        .map_err(|e| InstallError::Permissions {
            path: paths.script.clone(),
            source: e,
        })?
        .permissions();
    perms.set_mode(SCRIPT_MODE);
    std::fs::set_permissions(&paths.script, perms).map_err(|e| InstallError::Permissions {
        path: paths.script.clone(),
        source: e,
    })?;

    control
        .register_agent(&paths.agent)
        .map_err(|e| InstallError::Register { source: e })?;
    info!(label = %config.persistence.label, "launch agent registered");

    Ok(paths)
}

/// Render both artifacts and report the target paths without touching the
/// filesystem or the service manager.
pub fn dry_run(config: &GuardConfig, app_path: &Path) -> Result<InstallPaths, InstallError> {
    let paths = resolve_paths(config)?;
    render_script(app_path)?;
    render_agent(config, &paths.script)?;
    Ok(paths)
}
