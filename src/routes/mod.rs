pub mod files;

pub mod system;

pub use files::configure_file_routes;
pub use system::configure_system_routes;
