//! Delivery: pacing input against the consumer and handing results over

pub mod driver;
pub mod gate;
pub mod sink;

pub use gate::{Ack, Gate};
pub use sink::{Callback, Collected, Completion, Outcome};
