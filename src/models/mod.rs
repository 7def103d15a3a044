pub mod common;
pub mod files;
pub mod system;

pub use common::error_code::ErrorCode;
pub use common::response::ApiResponse;
