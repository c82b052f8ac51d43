// Static injection slots for concrete types and trait objects
use injectkit::{inject, Inject};

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct Config;

#[inject]
static CLOCK: Inject<dyn Clock> = Inject::new();

#[inject]
pub static CONFIG: Inject<Config> = Inject::new();

mod nested {
    use super::*;

    #[inject]
    pub(crate) static SECOND_CLOCK: Inject<dyn Clock> = Inject::new();
}

fn main() {
    assert!(CLOCK.get().is_none());
    assert!(!CONFIG.is_resolved());
    assert!(nested::SECOND_CLOCK.get().is_none());
}
