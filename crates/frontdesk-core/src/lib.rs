mod events;
mod protocol;

pub use events::*;
pub use protocol::*;
