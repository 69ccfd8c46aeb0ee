use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {0}: {1}")]
    ReadError(String, String),

    #[error("Failed to parse configuration file {0}: {1}")]
    ParseError(String, String),

    #[error("Missing required configuration keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub images_bucket: String,
    pub images_folder: String,
    pub annotations_bucket: String,
    pub annotations_folder: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            images_bucket: String::new(),
            images_folder: String::new(),
            annotations_bucket: String::new(),
            annotations_folder: String::new(),
        }
    }
}

impl StorageConfig {
    /// No static keys configured: credentials come from the AWS default chain
    pub fn uses_default_credentials(&self) -> bool {
        self.access_key_id.trim().is_empty() && self.secret_access_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub images_ttl_seconds: u64,
    pub annotations_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            images_ttl_seconds: 60,
            annotations_ttl_seconds: 10,
        }
    }
}

impl CacheConfig {
    pub fn images_ttl(&self) -> Duration {
        Duration::from_secs(self.images_ttl_seconds)
    }

    pub fn annotations_ttl(&self) -> Duration {
        Duration::from_secs(self.annotations_ttl_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub path: String,
    /// Maximum size of a single log file in megabytes
    pub size: u64,
    pub max_files: usize,
}

/// Keys of the plain key=value format that must be present and non-empty
const REQUIRED_KEY_VALUES: [&str; 8] = [
    "MINIO_IP",
    "MINIO_PORT",
    "ACCESS_KEY",
    "SECRET_KEY",
    "Minio_images_bucket",
    "Minio_annot_bucket",
    "SUPABASE_URL",
    "SUPABASE_KEY",
];

impl Config {
    /// Build a configuration from the flat key=value format
    pub fn from_key_values(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let missing: Vec<String> = REQUIRED_KEY_VALUES
            .iter()
            .filter(|key| get(**key).is_empty())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let scheme = match get("MINIO_SECURE").to_lowercase().as_str() {
            "true" | "1" | "yes" => "https",
            _ => "http",
        };
        let region = get("MINIO_REGION");

        Ok(Config {
            storage: StorageConfig {
                endpoint: format!("{}://{}:{}", scheme, get("MINIO_IP"), get("MINIO_PORT")),
                region: if region.is_empty() {
                    StorageConfig::default().region
                } else {
                    region
                },
                access_key_id: get("ACCESS_KEY"),
                secret_access_key: get("SECRET_KEY"),
                images_bucket: get("Minio_images_bucket"),
                images_folder: get("Minio_images_folder"),
                annotations_bucket: get("Minio_annot_bucket"),
                annotations_folder: get("Minio_annot_folder"),
            },
            auth: AuthConfig {
                url: get("SUPABASE_URL"),
                api_key: get("SUPABASE_KEY"),
            },
            cache: CacheConfig::default(),
            logging: None,
        })
    }

    /// Check that every required setting is present, reporting all gaps at once.
    ///
    /// The storage credentials may both be left empty to use the default AWS
    /// credential chain; setting only one of them is an error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut required = vec![
            ("storage.endpoint", &self.storage.endpoint),
            ("storage.images_bucket", &self.storage.images_bucket),
            ("storage.annotations_bucket", &self.storage.annotations_bucket),
            ("auth.url", &self.auth.url),
            ("auth.api_key", &self.auth.api_key),
        ];
        if !self.storage.uses_default_credentials() {
            required.insert(1, ("storage.access_key_id", &self.storage.access_key_id));
            required.insert(2, ("storage.secret_access_key", &self.storage.secret_access_key));
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys(missing))
        }
    }
}

/// Load configuration from `path`.
///
/// Files ending in `.toml` are parsed as a sectioned TOML document; anything
/// else is read as a flat `KEY=value` file.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let file = Path::new(path);

    let config = if file.extension().and_then(|ext| ext.to_str()) == Some("toml") {
        let config_text = fs::read_to_string(file)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e.to_string()))?;
        toml::from_str::<Config>(&config_text)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e.to_string()))?
    } else {
        let values = read_key_values(file)?;
        Config::from_key_values(&values)?
    };

    config.validate()?;
    Ok(config)
}

fn read_key_values(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;
    Ok(parse_key_values(&text))
}

/// Parse the flat `KEY=value` format.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Values are
/// taken verbatim after the first `=`, with surrounding quotes removed and no
/// variable expansion.
fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn toml_config_is_loaded_with_cache_defaults() {
        let file = write_temp(
            ".toml",
            r#"
[storage]
endpoint = "http://127.0.0.1:9000"
access_key_id = "user"
secret_access_key = "secret"
images_bucket = "preprocessed"
images_folder = "oakd_43"
annotations_bucket = "lameness"
annotations_folder = "oakd_43"

[auth]
url = "https://example.supabase.co"
api_key = "anon"
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.images_folder, "oakd_43");
        assert_eq!(config.cache.images_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.annotations_ttl(), Duration::from_secs(10));
        assert!(config.logging.is_none());
    }

    #[test]
    fn toml_config_reports_every_missing_key() {
        let file = write_temp(
            ".toml",
            r#"
[storage]
endpoint = "http://127.0.0.1:9000"
images_bucket = "preprocessed"
"#,
        );

        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        match err {
            ConfigError::MissingKeys(keys) => {
                assert_eq!(
                    keys,
                    vec!["storage.annotations_bucket", "auth.url", "auth.api_key"]
                );
            }
            other => panic!("Expected MissingKeys, got {:?}", other),
        }
    }

    #[test]
    fn key_value_config_builds_endpoint_from_ip_and_port() {
        let file = write_temp(
            ".yaml",
            r#"# storage
MINIO_IP="10.0.0.5"
MINIO_PORT="9090"
ACCESS_KEY="clientuser"
SECRET_KEY="s3cret"
Minio_images_bucket="preprocessed"
Minio_images_folder="oakd_43"
Minio_annot_bucket="lameness"
Minio_annot_folder="oakd_43"
SUPABASE_URL="https://example.supabase.co"
SUPABASE_KEY="anon"
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.storage.endpoint, "http://10.0.0.5:9090");
        assert_eq!(config.storage.access_key_id, "clientuser");
        assert_eq!(config.storage.annotations_bucket, "lameness");
        assert_eq!(config.auth.api_key, "anon");
    }

    #[test]
    fn key_value_config_honours_secure_flag() {
        let mut values = HashMap::new();
        for key in REQUIRED_KEY_VALUES {
            values.insert(key.to_string(), "x".to_string());
        }
        values.insert("MINIO_SECURE".to_string(), "True".to_string());

        let config = Config::from_key_values(&values).unwrap();
        assert_eq!(config.storage.endpoint, "https://x:x");
        assert_eq!(config.storage.images_folder, "");
    }

    #[test]
    fn key_value_config_without_credentials_is_rejected() {
        let file = write_temp(
            ".cfg",
            "MINIO_IP=10.0.0.5\nMINIO_PORT=9090\nMinio_images_bucket=preprocessed\n",
        );

        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        match err {
            ConfigError::MissingKeys(keys) => {
                assert!(keys.contains(&"ACCESS_KEY".to_string()));
                assert!(keys.contains(&"SECRET_KEY".to_string()));
                assert!(keys.contains(&"Minio_annot_bucket".to_string()));
                assert!(!keys.contains(&"MINIO_IP".to_string()));
            }
            other => panic!("Expected MissingKeys, got {:?}", other),
        }
    }

    #[test]
    fn toml_config_without_keys_uses_default_credentials() {
        let file = write_temp(
            ".toml",
            r#"
[storage]
endpoint = "https://s3.eu-central-1.amazonaws.com"
images_bucket = "preprocessed"
annotations_bucket = "lameness"

[auth]
url = "https://example.supabase.co"
api_key = "anon"
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert!(config.storage.uses_default_credentials());
    }

    #[test]
    fn toml_config_with_half_the_credentials_is_rejected() {
        let file = write_temp(
            ".toml",
            r#"
[storage]
endpoint = "http://127.0.0.1:9000"
access_key_id = "user"
images_bucket = "preprocessed"
annotations_bucket = "lameness"

[auth]
url = "https://example.supabase.co"
api_key = "anon"
"#,
        );

        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        match err {
            ConfigError::MissingKeys(keys) => {
                assert_eq!(keys, vec!["storage.secret_access_key"]);
            }
            other => panic!("Expected MissingKeys, got {:?}", other),
        }
    }

    #[test]
    fn key_value_config_keeps_dollar_signs_in_values() {
        let file = write_temp(
            ".txt",
            r#"MINIO_IP=10.0.0.5
MINIO_PORT=9000
ACCESS_KEY=clientuser
SECRET_KEY="pa$HOMEss"
Minio_images_bucket=preprocessed
Minio_annot_bucket=lameness
SUPABASE_URL=https://example.supabase.co
SUPABASE_KEY=anon
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.storage.secret_access_key, "pa$HOMEss");
    }

    #[test]
    fn key_value_config_skips_lines_without_equals() {
        let file = write_temp(
            ".yaml",
            r#"minio:
  # nested comment
MINIO_IP = 10.0.0.5
MINIO_PORT=9000

ACCESS_KEY=clientuser
SECRET_KEY=s3cret==
Minio_images_bucket=preprocessed
Minio_annot_bucket=lameness
SUPABASE_URL=https://example.supabase.co
SUPABASE_KEY=anon
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.storage.endpoint, "http://10.0.0.5:9000");
        assert_eq!(config.storage.secret_access_key, "s3cret==");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config("/nonexistent/annotator.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_, _)));
    }
}
