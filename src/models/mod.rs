pub mod chat;
pub mod text_to_sql;

pub use chat::*;
pub use text_to_sql::*;
