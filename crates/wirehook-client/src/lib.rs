//! Client side of the wirehook relay tunnel.
//!
//! The [`controller::ReconnectController`] opens the outbound gateway
//! connection, keeps the remote webhook subscription pointed at whatever
//! connection id is currently live, and emits forwarded events to an
//! [`output::EventSink`]. Everything else here serves that loop.

pub mod config;
pub mod controller;
pub mod error;
pub mod mock;
pub mod output;
pub mod platform;
pub mod subscription;

pub use config::ListenConfig;
pub use controller::{ControllerObserver, ControllerState, ReconnectController};
pub use error::ListenError;
pub use output::{EventSink, OutputMode, StdoutSink};
pub use platform::{HttpPlatformClient, PlatformClient};
