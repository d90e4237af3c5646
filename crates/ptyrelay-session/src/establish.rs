//! Session establishment: turn configuration plus a host environment
//! snapshot into a spawn request, and run the spawn off the async runtime.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use ptyrelay_common::PtyError;
use ptyrelay_config::{ShellConfig, TerminalConfig};

use crate::protocol::TermSize;
use crate::pty::{default_shell, PtyProcess, PtyProvider, SpawnRequest};

/// Variables that ask programs to disable color output.
const COLOR_SUPPRESSORS: &[&str] = &["NO_COLOR"];

// =============================================================================
// HOST ENVIRONMENT
// =============================================================================

/// The relay process's environment and working directory, captured once
/// so the establisher never reads ambient global state.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
}

impl HostEnvironment {
    /// Snapshot the current process. Variables that are not valid UTF-8
    /// are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let cwd = std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!("cannot read current directory, using /: {e}");
            PathBuf::from("/")
        });
        Self { vars, cwd }
    }

    pub fn new(vars: BTreeMap<String, String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            cwd: cwd.into(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn cwd(&self) -> &PathBuf {
        &self.cwd
    }
}

// =============================================================================
// ESTABLISHER
// =============================================================================

/// Builds and spawns the PTY child for each new connection.
pub struct Establisher {
    shell: ShellConfig,
    terminal: TerminalConfig,
    host: HostEnvironment,
    provider: Arc<dyn PtyProvider>,
}

impl Establisher {
    pub fn new(
        shell: ShellConfig,
        terminal: TerminalConfig,
        host: HostEnvironment,
        provider: Arc<dyn PtyProvider>,
    ) -> Self {
        Self {
            shell,
            terminal,
            host,
            provider,
        }
    }

    /// Configured program, else the host's `SHELL` (`COMSPEC` on Windows),
    /// else the platform default.
    pub fn resolve_program(&self) -> String {
        if !self.shell.program.trim().is_empty() {
            return self.shell.program.clone();
        }
        let key = if cfg!(windows) { "COMSPEC" } else { "SHELL" };
        match self.host.var(key) {
            Some(shell) if !shell.trim().is_empty() => shell.to_string(),
            _ => default_shell().to_string(),
        }
    }

    /// Requested geometry if present, else the configured default.
    pub fn initial_size(&self, requested: Option<TermSize>) -> TermSize {
        requested.unwrap_or(TermSize::new(
            self.terminal.default_cols,
            self.terminal.default_rows,
        ))
    }

    /// Inherited variables (optionally allowlisted), then terminal hints,
    /// then configured extras.
    fn environment(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = match &self.shell.env_allowlist {
            Some(allowed) => self
                .host
                .vars
                .iter()
                .filter(|(k, _)| allowed.iter().any(|a| a == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => self.host.vars.clone(),
        };

        for key in COLOR_SUPPRESSORS {
            env.remove(*key);
        }
        env.insert("TERM".into(), self.terminal.term.clone());
        if !self.terminal.colorterm.is_empty() {
            env.insert("COLORTERM".into(), self.terminal.colorterm.clone());
        }

        for (key, value) in &self.shell.env {
            env.insert(key.clone(), value.clone());
        }
        env
    }

    pub fn spawn_request(&self, requested: Option<TermSize>) -> SpawnRequest {
        let mut args = Vec::with_capacity(self.shell.args.len() + 1);
        if self.shell.login_shell && cfg!(unix) {
            args.push("-l".to_string());
        }
        args.extend(self.shell.args.iter().cloned());

        let cwd = self
            .shell
            .working_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.host.cwd.clone());

        SpawnRequest {
            program: self.resolve_program(),
            args,
            env: self.environment(),
            cwd,
            size: self.initial_size(requested),
        }
    }

    /// Spawn the child for a new session. The provider call blocks, so it
    /// runs on the blocking pool.
    pub async fn establish(
        &self,
        requested: Option<TermSize>,
    ) -> Result<(PtyProcess, TermSize), PtyError> {
        let request = self.spawn_request(requested);
        let size = request.size;
        let provider = Arc::clone(&self.provider);

        let process = tokio::task::spawn_blocking(move || provider.open(&request))
            .await
            .map_err(|e| PtyError::Spawn(format!("spawn task failed: {e}")))??;

        Ok((process, size))
    }
}

// =============================================================================
// TESTS
// =============================================================================
