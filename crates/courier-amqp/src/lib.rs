//! Courier AMQP — `Publisher` implementation over RabbitMQ.

pub mod publisher;

pub use publisher::{AmqpConfig, AmqpPublisher};
