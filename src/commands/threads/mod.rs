mod process_chat_message;

pub use process_chat_message::ProcessChatMessageCommand;
