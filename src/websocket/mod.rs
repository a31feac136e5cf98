pub mod handler;
pub mod session_handlers;

pub use handler::*;
