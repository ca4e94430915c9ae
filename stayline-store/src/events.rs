use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use stayline_core::notify::{ConfirmationJob, NotificationQueue};
use stayline_core::BoxError;

/// Kafka producer for jobs handed to the external task runner. Consumers own
/// delivery and retries; this side only guarantees the enqueue.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    confirmation_topic: String,
}

impl EventProducer {
    pub fn new(
        brokers: &str,
        confirmation_topic: &str,
    ) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            confirmation_topic: confirmation_topic.to_string(),
        })
    }

    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NotificationQueue for EventProducer {
    async fn enqueue_confirmation(&self, job: ConfirmationJob) -> Result<(), BoxError> {
        let payload = serde_json::to_string(&job)?;
        self.publish(&self.confirmation_topic, &job.booking_id.to_string(), &payload)
            .await?;
        Ok(())
    }
}
