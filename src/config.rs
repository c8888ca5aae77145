use std::path::PathBuf;

/// Top-level configuration assembled at startup.
///
/// The original utility baked these values into template bodies and call
/// sites; hoisting them here lets tests substitute paths and intervals
/// without touching rendering or loop logic.
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    pub network: NetworkConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// BSD device name of the wireless interface to keep powered.
    pub interface: String,
    /// Seconds between power-state checks.
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Launch agent label; also names the installed plist file.
    pub label: String,
    /// File name of the watchdog script, written to the home directory.
    pub script_name: String,
    /// Base directory for installed artifacts. None = the user's home.
    pub home_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: "en0".to_string(),
            poll_interval_secs: 10,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            label: "com.example.wifiprotector".to_string(),
            script_name: "monitor.sh".to_string(),
            home_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_installed_artifacts() {
        let config = GuardConfig::default();
        assert_eq!(config.network.interface, "en0");
        assert_eq!(config.network.poll_interval_secs, 10);
        assert_eq!(config.persistence.label, "com.example.wifiprotector");
        assert_eq!(config.persistence.script_name, "monitor.sh");
        assert!(config.persistence.home_dir.is_none());
    }
}
