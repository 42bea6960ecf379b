pub mod data;
pub mod manager;
pub mod store;

pub use data::{ActiveToken, Session};
pub use manager::SessionStore;
pub use store::{FileSessionStorage, MemorySessionStorage, SessionStorage, StoredEntries};
