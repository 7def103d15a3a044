mod r#impl;
mod structs;

pub use r#impl::DEFAULT_MAX_FILE_SIZE;
pub use structs::*;
