// Links every plugin crate so its #[provides]/#[inject] registrations reach inventory.
// Add new crates from ./modules here.
#![allow(unused_imports)]

use audit as _;
use kv_store as _;
