// Providers with every supported attribute form
use injectkit::{provides, ProvideError};

pub trait Store: Send + Sync {
    fn name(&self) -> &'static str;
}

pub trait Flush: Send + Sync {
    fn flush(&self);
}

#[derive(Default)]
#[provides]
pub struct Plain;

#[derive(Default)]
#[provides(priority = High, implements = [dyn Store, dyn Flush])]
pub struct MemStore;

impl Store for MemStore {
    fn name(&self) -> &'static str {
        "mem"
    }
}

impl Flush for MemStore {
    fn flush(&self) {}
}

#[provides(priority = "lowest", implements = [dyn Store], ctor = FileStore::new("/tmp/store"))]
pub struct FileStore {
    root: String,
}

impl FileStore {
    fn new(root: &str) -> Self {
        Self { root: root.to_string() }
    }
}

impl Store for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }
}

#[provides(priority = injectkit::Priority::Low, fallible, ctor = RemoteStore::connect())]
pub struct RemoteStore;

impl RemoteStore {
    fn connect() -> Result<Self, ProvideError> {
        Err(ProvideError::quietly_unprovidable("no endpoint configured"))
    }
}

fn main() {
    let _ = FileStore::new("x").root;
}
