pub mod handler;
pub mod phase;

pub use handler::CommandHandler;
pub use phase::SessionPhase;
