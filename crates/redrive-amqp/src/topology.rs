//! Dead-letter topology declaration for an origin queue.
//!
//! The pipeline's convention: each durable origin queue carries an
//! `x-dead-letter-exchange` argument pointing at a fanout exchange named
//! `<queue>_dlx`, which feeds the durable `<queue>_dlq`. Workers reject
//! terminally failed messages into the exchange; this tool reads them back
//! out of the queue.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::ExchangeKind;
use tracing::info;

use redrive_core::error::ChannelError;
use redrive_core::queue;

use crate::channel::{channel_error, AmqpChannel};

/// Queue argument naming the exchange dead letters are routed through.
const DEAD_LETTER_EXCHANGE_ARG: &str = "x-dead-letter-exchange";

/// The three names involved in one origin queue's dead-letter wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlqTopology {
    pub queue: String,
    pub dead_letter_queue: String,
    pub exchange: String,
}

impl DlqTopology {
    pub fn for_queue(origin: &str) -> Self {
        Self {
            queue: origin.to_string(),
            dead_letter_queue: queue::dlq_name(origin),
            exchange: queue::dlx_name(origin),
        }
    }
}

impl AmqpChannel<'_> {
    /// Declare the origin queue, its dead-letter exchange and queue, and the
    /// binding between them. Declarations are idempotent; re-running against
    /// an existing topology is a no-op.
    pub async fn ensure_dlq_topology(&mut self, origin: &str) -> Result<DlqTopology, ChannelError> {
        let topology = DlqTopology::for_queue(origin);
        let durable = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };

        self.channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;

        self.channel
            .queue_declare(&topology.dead_letter_queue, durable, FieldTable::default())
            .await
            .map_err(channel_error)?;

        self.channel
            .queue_bind(
                &topology.dead_letter_queue,
                &topology.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;

        let mut args = FieldTable::default();
        args.insert(
            DEAD_LETTER_EXCHANGE_ARG.to_string().into(),
            AMQPValue::LongString(topology.exchange.clone().into()),
        );
        self.channel
            .queue_declare(&topology.queue, durable, args)
            .await
            .map_err(channel_error)?;

        info!(
            queue = %topology.queue,
            dlq = %topology.dead_letter_queue,
            dlx = %topology.exchange,
            "dead-letter topology declared"
        );
        Ok(topology)
    }
}
