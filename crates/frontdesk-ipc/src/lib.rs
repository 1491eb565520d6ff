mod error;
mod process;
mod provider;

pub use error::IpcError;
pub use process::ProcessSpec;
pub use provider::{PendingReply, ProviderManager, ProviderSettings};
