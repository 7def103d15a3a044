pub mod client_ip;
pub mod filename;
pub mod parameter_error_handler;
pub mod random_code;

pub use client_ip::extract_client_ip;
pub use filename::{sanitize_filename, storage_extension};
pub use parameter_error_handler::json_error_handler;
pub use random_code::{CODE_ALPHABET, generate_code, is_well_formed_code, normalize_code};
