pub mod files;
pub mod system;

pub use files::FileService;
pub use system::SystemService;
