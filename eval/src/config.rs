//! Runtime knobs, read from the environment.
//!
//! | variable                | default | meaning                               |
//! |-------------------------|---------|---------------------------------------|
//! | `NANO_IRIS_ARENA_BYTES` | 8192    | size of the tensor arena              |
//! | `NANO_IRIS_PREVIEW`     | 10      | samples logged individually           |
//! | `NANO_IRIS_IDLE`        | false   | park forever after reporting          |
//! | `RUST_LOG`              | info    | log filter, read by `env_logger`      |

use nano_iris_core::TENSOR_ARENA_SIZE;

use crate::EvalError;

pub const ARENA_BYTES_VAR: &str = "NANO_IRIS_ARENA_BYTES";
pub const PREVIEW_VAR: &str = "NANO_IRIS_PREVIEW";
pub const IDLE_VAR: &str = "NANO_IRIS_IDLE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    pub arena_bytes: usize,
    pub preview: usize,
    pub idle_after_run: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { arena_bytes: TENSOR_ARENA_SIZE, preview: 10, idle_after_run: false }
    }
}

impl EvalConfig {
    pub fn from_env() -> Result<Self, EvalError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EvalError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ARENA_BYTES_VAR) {
            config.arena_bytes = match value.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => return Err(EvalError::Config { var: ARENA_BYTES_VAR, value }),
            };
        }
        if let Some(value) = lookup(PREVIEW_VAR) {
            config.preview = value
                .trim()
                .parse()
                .map_err(|_| EvalError::Config { var: PREVIEW_VAR, value: value.clone() })?;
        }
        if let Some(value) = lookup(IDLE_VAR) {
            config.idle_after_run = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => return Err(EvalError::Config { var: IDLE_VAR, value }),
            };
        }
        Ok(config)
    }
}
