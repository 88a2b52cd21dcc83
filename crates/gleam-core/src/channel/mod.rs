pub mod app;
pub mod inbound;

pub use app::*;
pub use inbound::*;
