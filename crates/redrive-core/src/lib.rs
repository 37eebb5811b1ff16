pub mod channel;
pub mod config;
pub mod error;
pub mod memory;
pub mod message;
pub mod ops;
pub mod queue;
pub mod report;
pub mod telemetry;

pub use channel::{AdminChannel, Delivery, OutboundMessage, QueueCounts};
pub use config::{AdminConfig, AmqpConfig, DlqConfig};
pub use error::{ChannelError, InspectError, PurgeError, RetryError};
pub use memory::MemoryBroker;
pub use message::{DeadLetterMessage, HeaderTable, HeaderValue, MessageHeaders};
pub use report::{
    BodyPreview, InspectReport, InspectedMessage, PurgeOutcome, QueueState, QueueStatus,
    RetryReport,
};
