use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions, QueueDeclareOptions,
    QueuePurgeOptions,
};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection};
use tracing::debug;

use redrive_core::channel::{AdminChannel, Delivery, OutboundMessage, QueueCounts};
use redrive_core::error::ChannelError;

use crate::connection::confirmed_channel;
use crate::convert;

/// Administrative republishes survive a broker restart.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// The session's single channel. All message operations on it are strictly
/// ordered through `&mut self`; no other component may touch it while an
/// operation is in flight.
pub struct AmqpChannel<'conn> {
    connection: &'conn Connection,
    pub(crate) channel: lapin::Channel,
}

impl<'conn> AmqpChannel<'conn> {
    pub(crate) fn new(connection: &'conn Connection, channel: lapin::Channel) -> Self {
        Self {
            connection,
            channel,
        }
    }

    /// The protocol closes a channel whose passive declare failed; open a
    /// fresh one so later operations on this session keep working.
    async fn reopen(&mut self) -> Result<(), ChannelError> {
        self.channel = confirmed_channel(self.connection)
            .await
            .map_err(channel_error)?;
        Ok(())
    }
}

#[async_trait]
impl AdminChannel for AmqpChannel<'_> {
    async fn queue_status(&mut self, queue: &str) -> Result<Option<QueueCounts>, ChannelError> {
        let options = QueueDeclareOptions {
            passive: true,
            ..QueueDeclareOptions::default()
        };
        match self
            .channel
            .queue_declare(queue, options, FieldTable::default())
            .await
        {
            Ok(declared) => Ok(Some(QueueCounts {
                message_count: declared.message_count(),
                consumer_count: declared.consumer_count(),
            })),
            Err(err) if is_not_found(&err) => {
                debug!(%queue, "passive declare: queue not found");
                self.reopen().await?;
                Ok(None)
            }
            Err(err) => Err(channel_error(err)),
        }
    }

    async fn fetch(&mut self, queue: &str) -> Result<Option<Delivery>, ChannelError> {
        let message = self
            .channel
            .basic_get(queue, BasicGetOptions { no_ack: false })
            .await
            .map_err(channel_error)?;

        let Some(message) = message else {
            return Ok(None);
        };
        let delivery = message.delivery;

        let headers = delivery
            .properties
            .headers()
            .as_ref()
            .map(convert::headers_from_table)
            .unwrap_or_default();
        let content_type = delivery
            .properties
            .content_type()
            .as_ref()
            .map(|ct| ct.as_str().to_string());

        Ok(Some(Delivery {
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            content_type,
            headers,
            body: delivery.data,
        }))
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), ChannelError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(channel_error)
    }

    async fn reject_requeue(&mut self, delivery_tag: u64) -> Result<(), ChannelError> {
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue: true,
                },
            )
            .await
            .map_err(channel_error)
    }

    async fn publish(
        &mut self,
        queue: &str,
        message: OutboundMessage,
    ) -> Result<(), ChannelError> {
        let mut properties = BasicProperties::default()
            .with_headers(convert::table_from_headers(&message.headers))
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);
        if let Some(content_type) = message.content_type {
            properties = properties.with_content_type(content_type.into());
        }

        // Publish on the default exchange with the queue name as routing
        // key, and wait for the broker's confirm before reporting success.
        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await
            .map_err(channel_error)?
            .await
            .map_err(channel_error)?;

        match confirm {
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
            Confirmation::Nack(_) => Err(ChannelError::Protocol(format!(
                "broker rejected publish to '{queue}'"
            ))),
        }
    }

    async fn purge(&mut self, queue: &str) -> Result<u32, ChannelError> {
        self.channel
            .queue_purge(queue, QueuePurgeOptions::default())
            .await
            .map_err(channel_error)
    }
}

pub(crate) fn channel_error(err: lapin::Error) -> ChannelError {
    match err {
        lapin::Error::IOError(io) => ChannelError::Io(io.to_string()),
        other => ChannelError::Protocol(other.to_string()),
    }
}

fn is_not_found(err: &lapin::Error) -> bool {
    matches!(
        err,
        lapin::Error::ProtocolError(amqp)
            if matches!(amqp.kind(), AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND))
    )
}
