// Test modules

pub mod common;
mod text_to_sql_test;
