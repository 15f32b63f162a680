use std::path::{Path, PathBuf};

use fleet::{FleetCredentials, DEFAULT_API_URL};
use serde::Deserialize;

use crate::error::{DeployError, DeployResult};

pub(crate) const DEFAULT_CONFIG_PATH: &str = "faucet.json";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Config {
    client_id: String,
    api_key: String,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    ssh_args: Vec<String>,
}

impl Config {
    pub(crate) fn load(path: &Path) -> DeployResult<Self> {
        let config_error = |message: String| DeployError::Config {
            path: path.to_path_buf(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|err| config_error(err.to_string()))?;
        config.validate().map_err(config_error)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("clientId must not be empty".to_string());
        }
        if self.api_key.trim().is_empty() {
            return Err("apiKey must not be empty".to_string());
        }
        if let Some(url) = self.api_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("apiUrl must be an http(s) url, got {url}"));
            }
        }
        Ok(())
    }

    pub(crate) fn credentials(&self) -> FleetCredentials {
        FleetCredentials {
            client_id: self.client_id.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
        }
    }

    pub(crate) fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub(crate) fn ssh_args(&self) -> &[String] {
        &self.ssh_args
    }
}

pub(crate) fn resolve_config_path(cli_value: Option<&PathBuf>) -> PathBuf {
    cli_value
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_dir;
    use std::fs;

    fn write_config(contents: &str) -> PathBuf {
        let path = temp_dir("faucet-config").join("faucet.json");
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn loads_credentials() {
        let path = write_config(r#"{"clientId": "abc", "apiKey": "xyz"}"#);
        let config = Config::load(&path).unwrap_or_else(|err| panic!("{err}"));
        let credentials = config.credentials();
        assert_eq!(credentials.client_id, "abc");
        assert_eq!(credentials.api_key, "xyz");
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert!(config.ssh_args().is_empty());
    }

    #[test]
    fn loads_optional_fields() {
        let path = write_config(
            r#"{
                "clientId": "abc",
                "apiKey": "xyz",
                "apiUrl": "http://127.0.0.1:9000/v1",
                "sshArgs": ["-p", "2222"]
            }"#,
        );
        let config = Config::load(&path).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(config.api_url(), "http://127.0.0.1:9000/v1");
        assert_eq!(config.ssh_args(), ["-p".to_string(), "2222".to_string()]);
    }

    #[test]
    fn missing_file_is_config_error() {
        let path = temp_dir("faucet-config").join("absent.json");
        let err = Config::load(&path).err().unwrap();
        assert!(matches!(err, DeployError::Config { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let path = write_config("{ clientId: abc");
        assert!(matches!(
            Config::load(&path).err().unwrap(),
            DeployError::Config { .. }
        ));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let path = write_config(r#"{"clientId": "abc"}"#);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn blank_client_id_is_rejected() {
        let path = write_config(r#"{"clientId": "  ", "apiKey": "xyz"}"#);
        let err = Config::load(&path).err().unwrap();
        assert!(err.to_string().contains("clientId must not be empty"));
    }

    #[test]
    fn default_path_is_local_file() {
        assert_eq!(resolve_config_path(None), PathBuf::from("faucet.json"));
        let custom = PathBuf::from("/etc/faucet.json");
        assert_eq!(resolve_config_path(Some(&custom)), custom);
    }
}
