// Channel module - bridged connections and the registry that owns them

mod core;
mod registry;

pub use self::core::{Channel, ChannelStatus, LocalChannelId, PeerChannelId, ILLEGAL_CHANNEL_ID};
pub use registry::{ChannelRegistry, RegistrationError, RegistryHandle, RegistryState};
