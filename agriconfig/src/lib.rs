#![allow(clippy::multiple_crate_versions)]

use agridoctor::session::TokenStore;
use serde::{Deserialize, Serialize};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const APP_NAME: &str = "agridoctor";
const SESSION_CONFIG: &str = "session";

/// Where a secret comes from: inline, an environment variable, or a command's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretSource {
    Literal(String),
    Env { env: String },
    Cmd { cmd: String },
}

/// Stored login, used when the CLI cannot prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginConfig {
    pub email: Option<String>,
    pub password: Option<SecretSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_explanation: bool,
    #[serde(default = "default_top_predictions")]
    pub top_predictions: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_explanation: true,
            top_predictions: default_top_predictions(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgriConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout; unset means wait for the service.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for AgriConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: None,
            login: LoginConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

fn default_api_url() -> String {
    agridoctor::DEFAULT_BASE_URL.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_top_predictions() -> usize {
    3
}

const fn default_history_limit() -> u32 {
    10
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Confy(#[from] confy::ConfyError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("empty secret; set `login.password` in the agridoctor config file")]
    EmptySecret,
    #[error("no {what} entered")]
    EmptyAnswer { what: &'static str },
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("environment variable '{env}' not found")]
    MissingEnv { env: String },
    #[error("secret command failed: {cmd}: {message}")]
    CommandFailed { cmd: String, message: String },
    #[error("failed to execute secret command '{cmd}': {source}")]
    CommandExec { cmd: String, source: io::Error },
    #[error("secret command returned empty output: {cmd}")]
    CommandEmpty { cmd: String },
    #[error(
        "{what} required but stdin is not interactive; set it in {path} (example: login = {{ email = \"...\", password = {{ env = \"AGRIDOCTOR_PASSWORD\" }} }})",
        path = .path.display()
    )]
    NonInteractive { what: &'static str, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl AgriConfig {
    /// Loads the config file from the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or deserialized.
    pub fn load() -> Result<Self> {
        Ok(confy::load(APP_NAME, None)?)
    }

    /// Loads the config from an explicit file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or deserialized.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(confy::load_path(path)?)
    }

    /// Stores the config to an explicit file path.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn store_to(&self, path: &Path) -> Result<()> {
        confy::store_path(path, self)?;
        Ok(())
    }

    /// Remembers `email` as the login email in the stored config, leaving
    /// every other stored setting as it is.
    ///
    /// # Errors
    /// Returns an error if the stored config cannot be read or written.
    pub fn remember_email(path: &Path, email: &str) -> Result<()> {
        let mut stored = Self::load_from(path)?;
        stored.login.email = Some(email.to_string());
        stored.store_to(path)
    }

    /// Path of the config file at the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the OS config directory cannot be determined.
    pub fn path() -> Result<PathBuf> {
        Ok(confy::get_configuration_file_path(APP_NAME, None)?)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Email from the config, or prompted on an interactive terminal.
    ///
    /// # Errors
    /// Returns an error when nothing is configured and stdin is not a terminal.
    pub fn login_email(&self) -> Result<String> {
        if let Some(email) = self.login.email.as_deref().map(str::trim) {
            if !email.is_empty() {
                return Ok(email.to_string());
            }
        }
        prompt("email", "Email: ")
    }

    /// Password from the configured secret source, or prompted on an
    /// interactive terminal.
    ///
    /// # Errors
    /// Returns an error if the secret cannot be resolved or prompting fails.
    pub fn login_password(&self) -> Result<String> {
        match &self.login.password {
            Some(source) => source.resolve(),
            None => prompt_password("password", "Password"),
        }
    }
}

/// Reads one trimmed line from stdin after printing `label` to stderr.
///
/// # Errors
/// Returns an error when stdin is not a terminal or the answer is empty.
pub fn prompt(what: &'static str, label: &str) -> Result<String> {
    ensure_interactive(what)?;

    eprint!("{label}");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyAnswer { what });
    }
    Ok(trimmed.to_string())
}

/// Reads a password from the terminal without echoing it. Empty answers are
/// asked again.
///
/// # Errors
/// Returns an error when stdin is not a terminal or the terminal fails.
pub fn prompt_password(what: &'static str, label: &str) -> Result<String> {
    ensure_interactive(what)?;
    Ok(dialoguer::Password::new().with_prompt(label).interact()?)
}

fn ensure_interactive(what: &'static str) -> Result<()> {
    if io::stdin().is_terminal() {
        return Ok(());
    }
    Err(ConfigError::NonInteractive {
        what,
        path: AgriConfig::path()?,
    })
}

impl SecretSource {
    /// Resolves the secret value.
    ///
    /// # Errors
    /// Returns an error if the variable is unset, the command fails, or the
    /// value is empty.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Literal(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::EmptySecret);
                }
                Ok(trimmed.to_string())
            }
            Self::Env { env } => {
                let value =
                    std::env::var(env).map_err(|_| ConfigError::MissingEnv { env: env.clone() })?;
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::EmptySecret);
                }
                Ok(trimmed.to_string())
            }
            Self::Cmd { cmd } => {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| ConfigError::CommandExec {
                        cmd: cmd.clone(),
                        source: e,
                    })?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(ConfigError::CommandFailed {
                        cmd: cmd.clone(),
                        message: stderr.trim().to_string(),
                    });
                }

                let stdout = String::from_utf8_lossy(&output.stdout);
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::CommandEmpty { cmd: cmd.clone() });
                }
                Ok(trimmed.to_string())
            }
        }
    }
}

// =============================================================================
// TOKEN STORAGE
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    token: Option<String>,
}

/// Bearer token persisted in its own confy file next to the main config.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store at the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the OS config directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: confy::get_configuration_file_path(APP_NAME, Some(SESSION_CONFIG))?,
        })
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, file: &SessionFile) -> io::Result<()> {
        confy::store_path(&self.path, file).map_err(io::Error::other)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file: SessionFile = confy::load_path(&self.path).map_err(io::Error::other)?;
        Ok(file.token.filter(|token| !token.trim().is_empty()))
    }

    fn save(&mut self, token: &str) -> io::Result<()> {
        tracing::debug!(path = %self.path.display(), "persisting token");
        self.write(&SessionFile {
            token: Some(token.to_string()),
        })
    }

    fn clear(&mut self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.write(&SessionFile::default())
    }
}
