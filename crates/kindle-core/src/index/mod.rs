mod icons;
mod snapshot;
mod store;

pub use icons::{CopyRenderer, IconCache, IconRenderer};
pub use snapshot::{CacheSnapshot, SNAPSHOT_FORMAT};
pub use store::CacheStore;
