pub mod converter;
pub mod entity;
pub mod schema;

pub use entity::{alert, monitoring_state, region};
pub use schema::setup_schema;
