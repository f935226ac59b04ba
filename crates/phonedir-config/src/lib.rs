use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use phonedir_core::{ConvertOptions, EntryOrder, InternationalPrefix, RenderOptions};
use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = "phonedir";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_ADDRESSBOOK: &str = "contacts";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub carddav: Option<CardDavConfig>,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDavConfig {
    /// Server base URL; the address book path is derived from it.
    pub url: Option<String>,
    /// Full collection URL, used as-is when set.
    pub addressbook_url: Option<String>,
    pub username: String,
    pub password: PasswordSource,
    pub addressbook: String,
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    Inline(String),
    Env(String),
}

impl CardDavConfig {
    pub fn resolve_password(&self) -> Result<String> {
        match &self.password {
            PasswordSource::Inline(password) => Ok(password.clone()),
            PasswordSource::Env(var) => match env::var(var) {
                Ok(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingPasswordEnv(var.clone())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub international_prefix: InternationalPrefix,
    pub sort: EntryOrder,
    pub honorific_prefix: bool,
    pub empty_placeholders: bool,
    pub output: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            international_prefix: InternationalPrefix::default(),
            sort: EntryOrder::Name,
            honorific_prefix: false,
            empty_placeholders: true,
            output: None,
        }
    }
}

impl DirectoryConfig {
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            international_prefix: self.international_prefix.clone(),
            order: self.sort,
            honorific_prefix: self.honorific_prefix,
            render: RenderOptions {
                empty_placeholders: self.empty_placeholders,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid international_prefix value: {0:?}")]
    InvalidInternationalPrefix(String),
    #[error("invalid carddav.{field}: {message}")]
    InvalidCardDavField {
        field: &'static str,
        message: String,
    },
    #[error("password environment variable {0} is not set")]
    MissingPasswordEnv(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    carddav: Option<CardDavFile>,
    directory: Option<DirectoryFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CardDavFile {
    url: Option<String>,
    addressbook_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
    addressbook: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
    verify_tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryFile {
    international_prefix: Option<String>,
    sort: Option<EntryOrder>,
    honorific_prefix: Option<bool>,
    empty_placeholders: Option<bool>,
    output: Option<PathBuf>,
}

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(directory) = parsed.directory {
        if let Some(raw) = directory.international_prefix {
            config.directory.international_prefix = InternationalPrefix::new(&raw)
                .map_err(|_| ConfigError::InvalidInternationalPrefix(raw))?;
        }
        if let Some(sort) = directory.sort {
            config.directory.sort = sort;
        }
        if let Some(enabled) = directory.honorific_prefix {
            config.directory.honorific_prefix = enabled;
        }
        if let Some(enabled) = directory.empty_placeholders {
            config.directory.empty_placeholders = enabled;
        }
        if let Some(output) = directory.output {
            if output.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(output));
            }
            config.directory.output = Some(output);
        }
    }

    if let Some(carddav) = parsed.carddav {
        config.carddav = Some(merge_carddav(carddav)?);
    }

    Ok(config)
}

fn merge_carddav(file: CardDavFile) -> Result<CardDavConfig> {
    let url = non_empty(file.url);
    let addressbook_url = non_empty(file.addressbook_url);
    if url.is_none() && addressbook_url.is_none() {
        return Err(invalid_carddav("url", "url or addressbook_url is required"));
    }

    let username = non_empty(file.username)
        .ok_or_else(|| invalid_carddav("username", "username is required"))?;

    let password = match (file.password, non_empty(file.password_env)) {
        (Some(_), Some(_)) => {
            return Err(invalid_carddav(
                "password",
                "set either password or password_env, not both",
            ))
        }
        (Some(password), None) => PasswordSource::Inline(password),
        (None, Some(var)) => PasswordSource::Env(var),
        (None, None) => {
            return Err(invalid_carddav(
                "password",
                "password or password_env is required",
            ))
        }
    };

    let addressbook =
        non_empty(file.addressbook).unwrap_or_else(|| DEFAULT_ADDRESSBOOK.to_string());
    if addressbook.contains('/') {
        return Err(invalid_carddav("addressbook", "must be a single name"));
    }

    let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(invalid_carddav("timeout_secs", "must be positive"));
    }

    Ok(CardDavConfig {
        url,
        addressbook_url,
        username,
        password,
        addressbook,
        user_agent: non_empty(file.user_agent),
        timeout_secs,
        verify_tls: file.verify_tls.unwrap_or(true),
    })
}

fn invalid_carddav(field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidCardDavField {
        field,
        message: message.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        load_at_path, merge_config, CardDavFile, ConfigError, ConfigFile, DirectoryFile,
        PasswordSource,
    };
    use phonedir_core::EntryOrder;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn restrict_permissions(path: &Path) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    fn carddav_file() -> CardDavFile {
        CardDavFile {
            url: Some("https://cloud.example.com".to_string()),
            username: Some("jane".to_string()),
            password: Some("secret".to_string()),
            ..CardDavFile::default()
        }
    }

    #[test]
    fn merge_config_defaults() {
        let merged = merge_config(ConfigFile::default()).expect("merge");
        assert!(merged.carddav.is_none());
        assert_eq!(merged.directory.international_prefix.as_str(), "00");
        assert_eq!(merged.directory.sort, EntryOrder::Name);
        assert!(merged.directory.empty_placeholders);
        assert!(!merged.directory.honorific_prefix);
    }

    #[test]
    fn merge_config_applies_values() {
        let parsed = ConfigFile {
            carddav: Some(CardDavFile {
                addressbook: Some("phones".to_string()),
                timeout_secs: Some(5),
                verify_tls: Some(false),
                ..carddav_file()
            }),
            directory: Some(DirectoryFile {
                international_prefix: Some("011".to_string()),
                sort: Some(EntryOrder::Source),
                honorific_prefix: Some(true),
                empty_placeholders: Some(false),
                output: Some("/tmp/directory.xml".into()),
            }),
        };
        let merged = merge_config(parsed).expect("merge");
        let carddav = merged.carddav.expect("carddav");
        assert_eq!(carddav.username, "jane");
        assert_eq!(carddav.addressbook, "phones");
        assert_eq!(carddav.timeout_secs, 5);
        assert!(!carddav.verify_tls);
        assert_eq!(carddav.password, PasswordSource::Inline("secret".to_string()));

        let options = merged.directory.convert_options();
        assert_eq!(options.international_prefix.as_str(), "011");
        assert_eq!(options.order, EntryOrder::Source);
        assert!(options.honorific_prefix);
        assert!(!options.render.empty_placeholders);
    }

    #[test]
    fn merge_config_rejects_invalid_prefix() {
        let parsed = ConfigFile {
            directory: Some(DirectoryFile {
                international_prefix: Some("+".to_string()),
                ..DirectoryFile::default()
            }),
            ..ConfigFile::default()
        };
        let err = merge_config(parsed).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInternationalPrefix(_)));
    }

    #[test]
    fn merge_config_validates_carddav() {
        let cases = [
            (
                CardDavFile {
                    url: None,
                    ..carddav_file()
                },
                "url",
            ),
            (
                CardDavFile {
                    username: Some(" ".to_string()),
                    ..carddav_file()
                },
                "username",
            ),
            (
                CardDavFile {
                    password_env: Some("PHONEDIR_PASSWORD".to_string()),
                    ..carddav_file()
                },
                "password",
            ),
            (
                CardDavFile {
                    password: None,
                    ..carddav_file()
                },
                "password",
            ),
            (
                CardDavFile {
                    timeout_secs: Some(0),
                    ..carddav_file()
                },
                "timeout_secs",
            ),
            (
                CardDavFile {
                    addressbook: Some("a/b".to_string()),
                    ..carddav_file()
                },
                "addressbook",
            ),
        ];

        for (file, expected) in cases {
            let err = merge_config(ConfigFile {
                carddav: Some(file),
                ..ConfigFile::default()
            })
            .unwrap_err();
            match err {
                ConfigError::InvalidCardDavField { field, .. } => assert_eq!(field, expected),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn resolve_password_reads_environment() {
        let var = "PHONEDIR_TEST_PASSWORD_RESOLVE";
        let merged = merge_config(ConfigFile {
            carddav: Some(CardDavFile {
                password: None,
                password_env: Some(var.to_string()),
                ..carddav_file()
            }),
            ..ConfigFile::default()
        })
        .expect("merge");
        let carddav = merged.carddav.expect("carddav");

        std::env::remove_var(var);
        assert!(matches!(
            carddav.resolve_password(),
            Err(ConfigError::MissingPasswordEnv(_))
        ));

        std::env::set_var(var, "from-env");
        assert_eq!(carddav.resolve_password().expect("password"), "from-env");
        std::env::remove_var(var);
    }

    #[test]
    fn load_at_path_requires_file_when_requested() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("config.toml");
        let err = load_at_path(&missing, true).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
        assert!(load_at_path(&missing, false).expect("optional").is_none());
    }

    #[test]
    fn load_at_path_parses_toml() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[carddav]\nurl = \"https://cloud.example.com\"\nusername = \"jane\"\npassword = \"pw\"\n\n[directory]\ninternational_prefix = \"00\"\nsort = \"source\"\noutput = \"gequdio.xml\"\n",
        )
        .expect("write config");
        restrict_permissions(&path);

        let config = load_at_path(&path, true).expect("load").expect("config");
        assert_eq!(config.directory.sort, EntryOrder::Source);
        assert_eq!(
            config.directory.output.as_deref(),
            Some(Path::new("gequdio.xml"))
        );
        assert_eq!(
            config.carddav.expect("carddav").addressbook,
            super::DEFAULT_ADDRESSBOOK
        );
    }

    #[test]
    fn load_at_path_rejects_unknown_fields() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[directory]\nprefix = \"00\"\n").expect("write config");
        restrict_permissions(&path);

        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn load_at_path_rejects_readable_config() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "").expect("write config");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&path, perms).expect("chmod");

        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::InsecurePermissions(_)));
    }
}
