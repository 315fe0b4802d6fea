pub mod admin;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod guard;
pub mod notify;
pub mod rides;
pub mod session;
pub mod storage;
pub mod types;

pub use error::{ApiError, ErrorKind};
pub use gateway::Gateway;
pub use session::{Session, SessionStatus, SessionStore};
