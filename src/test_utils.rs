use crate::config::{load_config, AuthConfig, CacheConfig, Config, StorageConfig};

pub const IMAGES_BUCKET: &str = "preprocessed";
pub const ANNOTATIONS_BUCKET: &str = "lameness";

/// Check if a test is enabled via environment variable
fn is_test_enabled(env_var: &str) -> bool {
    std::env::var(env_var)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Check if S3 tests are enabled via environment variable
pub fn is_s3_enabled() -> bool {
    is_test_enabled("ENABLE_S3_TESTS")
}

/// Load test configuration from config.toml
pub fn load_test_config() -> Result<Config, anyhow::Error> {
    let config_path = "config.toml";

    load_config(config_path).map_err(|e| anyhow::anyhow!("Failed to load config.toml: {}", e))
}

/// Creates a configuration that points at the fake buckets used by unit tests
///
/// Images and annotations share the `oakd_43` folder so sidecar keys line up
/// with image keys.
pub fn create_test_config() -> Config {
    Config {
        storage: StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
            images_bucket: IMAGES_BUCKET.to_string(),
            images_folder: "oakd_43".to_string(),
            annotations_bucket: ANNOTATIONS_BUCKET.to_string(),
            annotations_folder: "oakd_43".to_string(),
        },
        auth: AuthConfig {
            url: "http://localhost:54321".to_string(),
            api_key: "anon".to_string(),
        },
        cache: CacheConfig::default(),
        logging: None,
    }
}
