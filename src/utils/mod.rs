pub mod error;
pub mod formatters;
pub mod response;
pub mod sql_extraction;
pub mod string_ext;

pub use error::{ApiError, ApiResult};
pub use formatters::get_timestamp;
pub use response::{ApiResponse, Envelope};
pub use sql_extraction::{extract_sql, parse_judge_response, parse_sql_response};
pub use string_ext::{StringExt, clean_object};
