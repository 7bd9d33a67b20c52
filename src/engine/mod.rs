// src/engine/mod.rs

pub mod command;
pub mod ring;
pub mod session;
pub mod transport;

pub use command::Command;
pub use ring::RecentCommands;
pub use session::Session;
pub use transport::{RProcess, Transport, R_SLAVE};
