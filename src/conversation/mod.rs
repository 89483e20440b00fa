//! Multi-turn `/ask` conversations and their persistence across stateless
//! invocations.

pub mod controller;
pub mod key;
pub mod session;
pub mod store;

pub use controller::{ConversationController, ConversationSettings, Exchange, ASK_NAMESPACE};
pub use key::ConversationKey;
pub use session::{ConversationSession, Role, SessionState, Turn};
pub use store::{ConversationStore, Conversations};
