pub mod conversation;
pub mod document;

pub use conversation::ConversationEntry;
pub use document::Document;
