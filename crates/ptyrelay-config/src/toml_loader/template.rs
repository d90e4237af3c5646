//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# ptyrelay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "127.0.0.1"
# port = 7681
# path = "/ws"                 # omit to upgrade any request path
# max_message_bytes = 1048576  # 1024-67108864
# handshake_timeout_secs = 10  # 1-300

[shell]
# program = ""                 # empty: $SHELL, then /bin/sh
# args = []
# login_shell = false
# working_directory = "/home/me"
# env_allowlist = ["HOME", "PATH", "USER", "LANG"]

[shell.env]
# EDITOR = "nvim"

[terminal]
# default_cols = 80            # 1-1000
# default_rows = 24            # 1-1000
# term = "xterm-256color"
# colorterm = "truecolor"
# read_chunk_bytes = 8192      # 512-1048576
# channel_capacity = 64        # 1-4096
# exit_wait_secs = 2           # 1-60

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
