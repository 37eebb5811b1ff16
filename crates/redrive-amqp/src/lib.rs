//! RabbitMQ binding for the dead-letter administration operations.
//!
//! `AmqpConnection` owns the broker session for the duration of one
//! administrative operation; `AmqpChannel` implements the sequential
//! [`AdminChannel`](redrive_core::AdminChannel) contract over a lapin
//! channel with publisher confirms enabled.

mod channel;
mod connection;
mod convert;
mod topology;

pub use channel::AmqpChannel;
pub use connection::{AmqpConnection, ConnectError};
pub use topology::DlqTopology;
