pub mod clock;
pub mod position;
pub mod session;
pub mod utils;
