/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Publish targets and the sink contract.
//!
//! The message-bus client lives outside this crate; devices only see a
//! [`PublishSink`].  Publishing is fire-and-forget from the caller's point
//! of view: delivery, reconnects and queuing belong to the sink.

use std::sync::{Mutex, MutexGuard};

use crate::frame::Value;

/// Where and how a value is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub topic: String,
    pub qos: u8,
    pub retain: bool,
}

impl PublishTarget {
    pub fn new(topic: impl Into<String>, qos: u8, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            qos,
            retain,
        }
    }

    /// Child target `<topic>/<fragment>` with optional overrides; unset
    /// options are inherited from `self`.
    pub fn child(
        &self,
        fragment: &str,
        topic: Option<&str>,
        qos: Option<u8>,
        retain: Option<bool>,
    ) -> Self {
        Self {
            topic: match topic {
                Some(t) => t.to_string(),
                None => format!("{}/{}", self.topic, fragment),
            },
            qos: qos.unwrap_or(self.qos),
            retain: retain.unwrap_or(self.retain),
        }
    }
}

/// Receives every value a device decides to publish.
pub trait PublishSink: Send + Sync {
    fn publish(&self, target: &PublishTarget, value: &Value);
}

/// One recorded publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub target: PublishTarget,
    pub value: Value,
}

/// Sink that keeps every publish in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<Published>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Published>> {
        self.published.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Removes and returns everything published so far.
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.lock())
    }

    /// Values published to `topic`, oldest first.
    pub fn values_for(&self, topic: &str) -> Vec<Value> {
        self.lock()
            .iter()
            .filter(|p| p.target.topic == topic)
            .map(|p| p.value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl PublishSink for MemorySink {
    fn publish(&self, target: &PublishTarget, value: &Value) {
        self.lock().push(Published {
            target: target.clone(),
            value: value.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_unset_options() {
        let device = PublishTarget::new("meterbridge/11223344", 1, true);

        let channel = device.child("0100010800ff", None, None, None);
        assert_eq!(channel.topic, "meterbridge/11223344/0100010800ff");
        assert_eq!(channel.qos, 1);
        assert!(channel.retain);

        let custom = device.child("0100010800ff", Some("house/energy"), Some(2), Some(false));
        assert_eq!(custom, PublishTarget::new("house/energy", 2, false));
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let a = PublishTarget::new("a", 0, false);
        let b = PublishTarget::new("b", 0, false);
        sink.publish(&a, &Value::Number(1.0));
        sink.publish(&b, &Value::Number(2.0));
        sink.publish(&a, &Value::Number(3.0));

        assert_eq!(sink.values_for("a"), vec![Value::Number(1.0), Value::Number(3.0)]);
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.take().len(), 3);
        assert!(sink.is_empty());
    }
}
