pub mod backend;
pub mod wallet_store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use wallet_store::{WalletStore, WALLET_KEY};
