//! Process-wide log output for the statusboard binaries.

mod subscriber;

pub use subscriber::{LogFormat, init_tracing, init_tracing_with};
