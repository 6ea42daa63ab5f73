pub mod delta;
pub mod message;

pub use delta::DeltaEvent;
pub use message::{ChatMessage, Role};
