//! # Bus Messages
//!
//! Defines what flows through a communicator and which bus backends exist.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A raw message as delivered by the bus client.
///
/// Kafka and Redis Streams hand over bytes; in-process publishers may hand
/// over an already structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Bytes(Vec<u8>),
    Value(serde_json::Value),
}

impl BusMessage {
    /// Serialize any value into a structured message.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Value)
    }

    /// The message as bytes, serializing structured values.
    ///
    /// # Errors
    ///
    /// Fails only if a structured value cannot be written as JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Value(value) => serde_json::to_vec(value),
        }
    }
}

impl From<Vec<u8>> for BusMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<serde_json::Value> for BusMessage {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

/// Supported message bus backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageBusType {
    Kafka,
    RedisStreams,
    InMemory,
}

/// Unknown bus type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message bus type: {0}")]
pub struct ParseBusTypeError(pub String);

impl FromStr for MessageBusType {
    type Err = ParseBusTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "kafka" => Ok(Self::Kafka),
            "redisstreams" | "redis" => Ok(Self::RedisStreams),
            "inmemory" | "memory" => Ok(Self::InMemory),
            _ => Err(ParseBusTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for MessageBusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kafka => write!(f, "Kafka"),
            Self::RedisStreams => write!(f, "RedisStreams"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

impl Serialize for MessageBusType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageBusType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
