pub mod manager;
pub mod types;

pub use manager::ConversationStore;
pub use types::{Turn, TurnKind, TurnWindow};
