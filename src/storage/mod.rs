pub mod integrity;
pub mod object_store;
pub mod removal;

pub use object_store::{Download, ObjectStore, StoreSettings, SweepReport};
pub use removal::PendingRemoval;
