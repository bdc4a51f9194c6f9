use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const TRACE_ENV_VAR: &str = "FORANY_DEBUG_TRACE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontendOptions {
    /// Recognize the Checked C keywords (`-fcheckedc-extension`).
    pub checked_extension: bool,
    /// Log scope and binding activity to stderr.
    pub trace: bool,
    /// Calls to `_For_any` functions must spell out `<...>` type arguments.
    pub require_type_arguments: bool,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        Self {
            checked_extension: true,
            trace: false,
            require_type_arguments: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid frontend configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    frontend: Option<RawFrontend>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawFrontend {
    checked_extension: Option<bool>,
    trace: Option<bool>,
    require_type_arguments: Option<bool>,
}

impl FrontendOptions {
    /// Reads the `[frontend]` table; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut options = Self::default();
        if let Some(frontend) = raw.frontend {
            if let Some(flag) = frontend.checked_extension {
                options.checked_extension = flag;
            }
            if let Some(flag) = frontend.trace {
                options.trace = flag;
            }
            if let Some(flag) = frontend.require_type_arguments {
                options.require_type_arguments = flag;
            }
        }
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if env::var_os(TRACE_ENV_VAR).is_some() {
            self.trace = true;
        }
        self
    }
}
