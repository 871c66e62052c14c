pub mod bus;

pub use bus::{EventBus, SharedEventBus};

pub fn init() {
    tracing::info!("Core library initialized");
}
