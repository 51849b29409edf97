//! `printbridge.toml` settings.

use anyhow::Context;
use printbridge_batch::BatchConfig;
use printbridge_client::{BridgeConfig, ReconnectPolicy};
use printbridge_core::DEFAULT_ENDPOINT;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "printbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bridge: BridgeSection,
    pub remote: RemoteSection,
    pub print: PrintSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSection {
    pub endpoint: String,
    pub handshake_timeout_secs: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            handshake_timeout_secs: 10,
            reconnect_initial_ms: 100,
            reconnect_max_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSection {
    pub base_url: String,
    pub method: String,
    pub render_method: String,
    pub print_format: String,
    pub token: Option<String>,
    pub call_timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            method: "medis.api.apply_action".to_string(),
            render_method: "silent_print.utils.print_format.create_pdf".to_string(),
            print_format: "Medis Split Invoice".to_string(),
            token: None,
            call_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintSection {
    pub invoice_printer: String,
    pub label_printer: String,
}

impl Default for PrintSection {
    fn default() -> Self {
        Self {
            invoice_printer: "Invoice Printer".to_string(),
            label_printer: "Label Printer".to_string(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `printbridge.toml` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            handshake_timeout: Duration::from_secs(self.bridge.handshake_timeout_secs),
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_millis(self.bridge.reconnect_initial_ms),
                max_delay: Duration::from_millis(self.bridge.reconnect_max_ms),
                ..ReconnectPolicy::default()
            },
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            call_timeout: Duration::from_secs(self.remote.call_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bridge.endpoint, "ws://127.0.0.1:12212/printer");
        assert_eq!(settings.batch_config().call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bridge]
endpoint = "ws://10.0.0.5:12212/printer"
reconnect_max_ms = 2000

[remote]
base_url = "https://erp.example.com"
token = "key:secret"
call_timeout_secs = 5
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.bridge.endpoint, "ws://10.0.0.5:12212/printer");
        assert_eq!(settings.bridge.handshake_timeout_secs, 10);
        assert_eq!(settings.remote.token.as_deref(), Some("key:secret"));
        assert_eq!(settings.print, PrintSection::default());

        let bridge = settings.bridge_config();
        assert_eq!(bridge.reconnect.max_delay, Duration::from_secs(2));
        assert_eq!(bridge.reconnect.initial_delay, Duration::from_millis(100));
        assert_eq!(settings.batch_config().call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn example_file_parses() {
        let settings: Settings =
            toml::from_str(include_str!("../../../printbridge.example.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bridge]\nendpiont = \"ws://x\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
