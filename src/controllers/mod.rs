//! Controllers turn validated request data into commands and run them.

pub mod text_to_sql_controller;
pub mod thread_controller;

pub use text_to_sql_controller::TextToSqlController;
pub use thread_controller::ThreadController;
