#![forbid(unsafe_code)]

pub mod error;
pub mod runner;
pub mod store;
pub mod ticker;

pub use drill_core::Clock;

pub use error::SessionError;
pub use runner::{
    DiscardResults, DrillReport, DrillRunner, ResultConsumer, ResultDestination, SubmitTrigger,
};
pub use store::SessionStore;
pub use ticker::{Tick, Ticker};
