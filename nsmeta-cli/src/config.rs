//! TOML-backed process configuration.

use std::path::Path;

use serde::Deserialize;

/// Persistent configuration, loaded from a TOML file and overridable by CLI
/// flags (spec §6 "Environment": "default I/O enabled on newly created
/// inodes" is the one process-wide option the spec calls out by name; the
/// rest is the ambient connection/dialect wiring any deployment needs).
#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceConfig {
    pub database_url: String,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default)]
    pub default_io_enabled: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_dialect() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl NamespaceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_absent() {
        let config: NamespaceConfig = toml::from_str(
            r#"database_url = "postgres://localhost/nsmeta""#,
        )
        .unwrap();
        assert_eq!(config.dialect, "postgres");
        assert!(!config.default_io_enabled);
        assert_eq!(config.max_connections, 5);
    }
}
