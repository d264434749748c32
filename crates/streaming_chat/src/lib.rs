mod error;
pub mod utils;
pub use error::{Error, Result};

pub mod chat_completions;
pub mod clients;
pub mod config;
pub mod delta;
pub mod finish_reason;
pub mod history;
pub mod session;
pub mod sse;

pub use config::SessionConfig;
pub use session::{ChatSession, SessionState};
