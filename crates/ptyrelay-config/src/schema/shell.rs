//! Shell process configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shell process settings.
///
/// Controls which shell to launch, its arguments, working directory,
/// and the environment it inherits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program path. Empty string means auto-detect from `$SHELL`.
    pub program: String,
    /// Extra arguments passed to the shell.
    pub args: Vec<String>,
    /// Pass `-l` so the shell reads its login profile (Unix only).
    pub login_shell: bool,
    /// Initial working directory. `None` means the relay's own directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Extra environment variables, applied after the terminal hints.
    pub env: HashMap<String, String>,
    /// When set, only these inherited variables reach the shell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_allowlist: Option<Vec<String>>,
}
