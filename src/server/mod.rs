//! Network access to negotiations

pub mod message;
pub mod session_server;

pub use message::{ClientRequest, ServerMessage};
pub use session_server::SessionServer;
