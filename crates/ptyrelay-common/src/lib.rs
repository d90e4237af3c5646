pub mod errors;
pub mod id;

pub use errors::{ConfigError, PtyError, RelayError, SessionError};
pub use id::{new_id, SessionId};

pub type Result<T> = std::result::Result<T, RelayError>;
