pub mod duration;
pub mod error;
pub mod metrics;
pub mod suggestion;
pub mod trace;
