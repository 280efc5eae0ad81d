pub mod image_pool;
pub mod preferences;
pub mod store;

pub use image_pool::ImageNumberPool;
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use store::SessionStore;
