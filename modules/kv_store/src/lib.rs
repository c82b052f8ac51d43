//! Key-value storage backends exposed through the `Store` capability.
//!
//! | provider      | priority | availability                              |
//! |---------------|----------|-------------------------------------------|
//! | `FileStore`   | Normal   | always                                    |
//! | `MemStore`    | High     | always                                    |
//! | `RemoteStore` | Highest  | only when `KV_STORE_REMOTE_URL` is set    |

pub mod file;
pub mod memory;
pub mod remote;
pub mod store;

pub use file::FileStore;
pub use memory::MemStore;
pub use remote::RemoteStore;
pub use store::{Store, StoreError};
