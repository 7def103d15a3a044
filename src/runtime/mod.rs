pub mod janitor;
pub mod lifetime;
