// Configuration loading and parsing (client.toml, credentials.toml, env).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub llm: LlmConfig,
    pub preview: PreviewConfig,
    pub storage: StorageConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire client.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ClientFile {
    api: ApiConfig,
    llm: LlmConfig,
    #[serde(default)]
    preview: PreviewConfig,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Marketplace backend root, e.g. `http://localhost:4000`.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    /// Used for grounded research, market insights and opportunity analysis.
    pub research_model: String,
    /// Used for spec sheets and keyword suggestions.
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_preview_host")]
    pub host: String,
    #[serde(default = "default_preview_port")]
    pub port: u16,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            enabled: false,
            host: default_preview_host(),
            port: default_preview_port(),
        }
    }
}

fn default_preview_host() -> String {
    "127.0.0.1".to_string()
}

fn default_preview_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// SQLite file for the persisted session. Empty means the platform data
    /// directory.
    #[serde(default)]
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub gemini_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/client.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Environment overrides are not applied here; see
/// [`apply_env_overrides`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- client.toml (required) ---
    let client_path = config_dir.join("client.toml");
    let client_text = read_file(&client_path)?;
    let client: ClientFile =
        toml::from_str(&client_text).map_err(|e| ConfigError::ParseError {
            path: client_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        api: client.api,
        llm: client.llm,
        preview: client.preview,
        storage: client.storage,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Apply environment overrides on top of file configuration, then
/// re-validate.
///
/// - `XB2BX_API_URL` replaces `api.base_url`
/// - `PORT` replaces `preview.port`
/// - `GEMINI_API_KEY`, falling back to `API_KEY`, replaces the API key
///
/// `lookup` abstracts the environment so tests don't touch process state.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("XB2BX_API_URL").filter(|v| !v.is_empty()) {
        config.api.base_url = url;
    }

    if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
        config.preview.port = port.trim().parse().map_err(|_| ConfigError::ValidationError {
            field: "PORT".into(),
            message: format!("must be a port number, got {port:?}"),
        })?;
    }

    let key = lookup("GEMINI_API_KEY")
        .filter(|v| !v.is_empty())
        .or_else(|| lookup("API_KEY").filter(|v| !v.is_empty()));
    if let Some(key) = key {
        config.credentials.gemini_api_key = Some(key);
    }

    validate(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first and applying process environment
/// overrides last.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

impl Config {
    /// Resolve the session database path, defaulting to
    /// `<platform data dir>/session.db` when `storage.db_path` is empty.
    pub fn session_db_path(&self) -> Result<String, ConfigError> {
        if !self.storage.db_path.is_empty() {
            return Ok(self.storage.db_path.clone());
        }
        let dirs = directories::ProjectDirs::from("com", "xb2bx", "xb2bx").ok_or_else(|| {
            ConfigError::ValidationError {
                field: "storage.db_path".into(),
                message: "empty and no platform data directory is available".into(),
            }
        })?;
        Ok(dirs.data_dir().join("session.db").display().to_string())
    }

    /// API key for the generative-AI provider, if one is configured.
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.credentials
            .gemini_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.api.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: format!("must start with http:// or https://, got {url:?}"),
        });
    }

    let endpoint = config.llm.endpoint.as_str();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "llm.endpoint".into(),
            message: format!("must start with http:// or https://, got {endpoint:?}"),
        });
    }

    let model_fields: &[(&str, &str)] = &[
        ("llm.research_model", &config.llm.research_model),
        ("llm.text_model", &config.llm.text_model),
        ("llm.image_model", &config.llm.image_model),
    ];
    for (name, val) in model_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.preview.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "preview.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Helper: returns the workspace root holding `defaults/` (works whether
    /// `cargo test` runs from the crate directory or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("../../defaults").exists() {
            cwd.join("../..")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    fn write_client_toml(dir: &Path, body: &str) {
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("client.toml"), body).unwrap();
    }

    const MINIMAL: &str = r#"
[api]
base_url = "http://localhost:4000"

[llm]
endpoint = "https://generativelanguage.googleapis.com"
research_model = "gemini-3-pro-preview"
text_model = "gemini-3-flash-preview"
image_model = "gemini-2.5-flash-image"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_copy_and_load() {
        let root = project_root();
        let scratch = tempfile::tempdir().unwrap();
        let defaults = scratch.path().join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        for entry in fs::read_dir(root.join("defaults")).unwrap() {
            let path = entry.unwrap().path();
            fs::copy(&path, defaults.join(path.file_name().unwrap())).unwrap();
        }

        let copied = ensure_config_files(scratch.path()).unwrap();
        assert!(copied.iter().any(|p| p.ends_with("client.toml")));
        assert!(!copied.iter().any(|p| p.to_string_lossy().ends_with(".example")));

        let config = load_config_from(scratch.path()).expect("defaults should load");
        assert_eq!(config.api.base_url, "http://localhost:4000");
        assert_eq!(config.llm.research_model, "gemini-3-pro-preview");
        assert_eq!(config.llm.text_model, "gemini-3-flash-preview");
        assert_eq!(config.llm.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.preview.port, 8080);
        assert!(!config.preview.enabled);
        assert!(config.gemini_api_key().is_none());
    }

    #[test]
    fn ensure_config_files_does_not_overwrite() {
        let scratch = tempfile::tempdir().unwrap();
        let defaults = scratch.path().join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("client.toml"), MINIMAL).unwrap();
        write_client_toml(scratch.path(), "# edited by user\n");

        let copied = ensure_config_files(scratch.path()).unwrap();
        assert!(copied.is_empty());
        let kept = fs::read_to_string(scratch.path().join("config/client.toml")).unwrap();
        assert_eq!(kept, "# edited by user\n");
    }

    #[test]
    fn ensure_config_files_errors_without_any_directory() {
        let scratch = tempfile::tempdir().unwrap();
        let err = ensure_config_files(scratch.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));
    }

    #[test]
    fn missing_client_toml_is_file_not_found() {
        let scratch = tempfile::tempdir().unwrap();
        let err = load_config_from(scratch.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        let config = load_config_from(scratch.path()).unwrap();
        assert_eq!(config.preview.host, "127.0.0.1");
        assert_eq!(config.preview.port, 8080);
        assert!(config.storage.db_path.is_empty());
    }

    #[test]
    fn credentials_file_is_read_when_present() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        fs::write(
            scratch.path().join("config/credentials.toml"),
            "gemini_api_key = \"secret\"\n",
        )
        .unwrap();
        let config = load_config_from(scratch.path()).unwrap();
        assert_eq!(config.gemini_api_key(), Some("secret"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), "[api\nbase_url = ");
        let err = load_config_from(scratch.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn non_http_base_url_fails_validation() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(
            scratch.path(),
            &MINIMAL.replace("http://localhost:4000", "localhost:4000"),
        );
        let err = load_config_from(scratch.path()).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "api.base_url"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_model_fails_validation() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(
            scratch.path(),
            &MINIMAL.replace("\"gemini-2.5-flash-image\"", "\"  \""),
        );
        let err = load_config_from(scratch.path()).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "llm.image_model"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        let mut config = load_config_from(scratch.path()).unwrap();

        apply_env_overrides(
            &mut config,
            env(&[
                ("XB2BX_API_URL", "https://api.example.com"),
                ("PORT", "9090"),
                ("API_KEY", "from-api-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.preview.port, 9090);
        assert_eq!(config.gemini_api_key(), Some("from-api-key"));
    }

    #[test]
    fn gemini_api_key_wins_over_api_key() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        let mut config = load_config_from(scratch.path()).unwrap();
        apply_env_overrides(
            &mut config,
            env(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "fallback")]),
        )
        .unwrap();
        assert_eq!(config.gemini_api_key(), Some("primary"));
    }

    #[test]
    fn unparseable_port_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        let mut config = load_config_from(scratch.path()).unwrap();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(scratch.path(), MINIMAL);
        let mut config = load_config_from(scratch.path()).unwrap();
        apply_env_overrides(&mut config, env(&[("XB2BX_API_URL", ""), ("PORT", "")])).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:4000");
        assert_eq!(config.preview.port, 8080);
    }

    #[test]
    fn explicit_db_path_is_used_verbatim() {
        let scratch = tempfile::tempdir().unwrap();
        write_client_toml(
            scratch.path(),
            &format!("{MINIMAL}\n[storage]\ndb_path = \"data/session.db\"\n"),
        );
        let config = load_config_from(scratch.path()).unwrap();
        assert_eq!(config.session_db_path().unwrap(), "data/session.db");
    }
}
