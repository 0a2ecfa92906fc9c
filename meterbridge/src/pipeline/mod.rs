/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Channel pipelines and the per-device registry that owns them.
//!
//! ```text
//! Frame ──► ChannelRegistry ──┬─► ChannelPipeline(0100010800ff) ──► PublishSink
//!                             ├─► ChannelPipeline(0100100700ff) ──► PublishSink
//!                             └─  skipped: 0100000009ff, …
//! ```
//!
//! After setup every channel of a frame must be either processed or
//! skipped, and every processed channel must appear in every frame.

pub mod builder;

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, error};

use crate::frame::{Frame, Timestamp, Value};
use crate::operation::{FrameContext, Operation, OperationError};
use crate::sink::{PublishSink, PublishTarget};

pub use builder::{build_registry, BuildError, SetupContext};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// An operation failed for one channel.
    #[error("channel {channel}: {source}")]
    Operation {
        channel: String,
        #[source]
        source: OperationError,
    },

    /// The frame carries channels that are neither processed nor skipped.
    #[error("unprocessed channels received: {}", .0.join(", "))]
    UnprocessedChannels(Vec<String>),

    /// Processed channels are missing from the frame.
    #[error("expected channels missing from frame: {}", .0.join(", "))]
    MissingChannels(Vec<String>),

    #[error("channel {0} is marked as skipped and can not be processed")]
    Skipped(String),

    #[error("channel {0} already has a pipeline")]
    Duplicate(String),
}

// ── ChannelPipeline ───────────────────────────────────────────────────────────

/// Ordered operations bound to one channel and one publish target.
#[derive(Debug, Clone)]
pub struct ChannelPipeline {
    channel: String,
    target: PublishTarget,
    operations: Vec<Operation>,
    last_publish: Option<Timestamp>,
}

impl ChannelPipeline {
    pub fn new(channel: impl Into<String>, target: PublishTarget, operations: Vec<Operation>) -> Self {
        Self {
            channel: channel.into(),
            target,
            operations,
            last_publish: None,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn target(&self) -> &PublishTarget {
        &self.target
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn last_publish(&self) -> Option<Timestamp> {
        self.last_publish
    }

    /// Runs the channel's value through every operation and publishes the
    /// result, if any.  Every operation is called, also with `None`, so
    /// time-driven actions see each tick.
    pub fn process(
        &mut self,
        frame: &Frame,
        sink: &dyn PublishSink,
    ) -> Result<Option<Value>, OperationError> {
        let Some(entry) = frame.get(&self.channel) else {
            return Ok(None);
        };

        let ctx = FrameContext::new(frame, self.last_publish);
        let mut value = entry.value();
        for op in &mut self.operations {
            value = op.apply(value, &ctx)?;
        }

        if let Some(v) = &value {
            sink.publish(&self.target, v);
            self.last_publish = Some(frame.timestamp);
        }
        Ok(value)
    }

    pub fn describe(&self) -> Vec<String> {
        let mut out = vec![
            "<ChannelPipeline>".to_string(),
            format!("  channel: {}", self.channel),
            format!("  topic  : {}", self.target.topic),
            "  operations:".to_string(),
        ];
        for op in &self.operations {
            op.describe_into("    ", &mut out);
        }
        out.push(String::new());
        out
    }
}

// ── ChannelRegistry ───────────────────────────────────────────────────────────

/// All pipelines of one device plus the set of skipped channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    processed: BTreeSet<String>,
    skipped: BTreeSet<String>,
    pipelines: Vec<ChannelPipeline>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `channel` as skipped.  A channel that already has a pipeline
    /// keeps it and is not skipped.
    pub fn skip(&mut self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        if self.processed.contains(&channel) {
            return false;
        }
        self.skipped.insert(channel)
    }

    pub fn add_pipeline(&mut self, pipeline: ChannelPipeline) -> Result<(), RegistryError> {
        let channel = pipeline.channel().to_string();
        if self.skipped.contains(&channel) {
            return Err(RegistryError::Skipped(channel));
        }
        if !self.processed.insert(channel.clone()) {
            return Err(RegistryError::Duplicate(channel));
        }
        self.pipelines.push(pipeline);
        Ok(())
    }

    pub fn is_skipped(&self, channel: &str) -> bool {
        self.skipped.contains(channel)
    }

    pub fn is_processed(&self, channel: &str) -> bool {
        self.processed.contains(channel)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(String::as_str)
    }

    pub fn pipelines(&self) -> &[ChannelPipeline] {
        &self.pipelines
    }

    pub fn pipeline(&self, channel: &str) -> Option<&ChannelPipeline> {
        self.pipelines.iter().find(|p| p.channel() == channel)
    }

    /// Processes one frame.
    ///
    /// A failing pipeline does not stop its siblings; the first failure is
    /// returned after all pipelines ran.  Without operation failures the
    /// frame is then checked for unprocessed and missing channels.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        sink: &dyn PublishSink,
    ) -> Result<(), RegistryError> {
        let mut first_error = None;

        for pipeline in &mut self.pipelines {
            match pipeline.process(frame, sink) {
                Ok(Some(value)) => debug!(channel = %pipeline.channel(), %value, "published"),
                Ok(None) => {}
                Err(source) => {
                    let err = RegistryError::Operation {
                        channel: pipeline.channel().to_string(),
                        source,
                    };
                    if first_error.is_none() {
                        first_error = Some(err);
                    } else {
                        error!("{err}");
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let unprocessed: Vec<String> = frame
            .channel_ids()
            .filter(|id| !self.processed.contains(*id) && !self.skipped.contains(*id))
            .map(str::to_string)
            .collect();
        if !unprocessed.is_empty() {
            return Err(RegistryError::UnprocessedChannels(unprocessed));
        }

        let missing: Vec<String> = self
            .processed
            .iter()
            .filter(|id| !frame.contains(id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingChannels(missing));
        }

        Ok(())
    }

    pub fn describe(&self) -> Vec<String> {
        let skipped: Vec<&str> = self.skipped().collect();
        let mut out = vec![format!("Skipped: {}", skipped.join(", ")), String::new()];
        for pipeline in &self.pipelines {
            out.extend(pipeline.describe());
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameEntry;
    use crate::operation::testing::wall;
    use crate::operation::{EnergyMeterSignWorkaround, Factor, OnChangeFilter, RefreshAction, SkipBelowThreshold};
    use crate::sink::MemorySink;

    const ENERGY: &str = "0100010800ff";
    const POWER: &str = "0100100700ff";
    const SERIAL: &str = "0100000009ff";

    fn target(channel: &str) -> PublishTarget {
        PublishTarget::new(format!("meterbridge/dev/{channel}"), 0, false)
    }

    fn frame(ts: f64, entries: &[(&str, f64)]) -> Frame {
        Frame::at(
            ts,
            wall(),
            entries
                .iter()
                .map(|(id, v)| (id.to_string(), FrameEntry::number(*v))),
        )
    }

    fn energy_pipeline() -> ChannelPipeline {
        ChannelPipeline::new(
            ENERGY,
            target(ENERGY),
            vec![
                Operation::Factor(Factor { factor: 0.001 }),
                Operation::SkipBelowThreshold(SkipBelowThreshold),
                Operation::OnChange(OnChangeFilter::new()),
                Operation::Refresh(RefreshAction::new(120.0)),
            ],
        )
    }

    #[test]
    fn default_pipeline_publishes_changes_and_refreshes() {
        let sink = MemorySink::new();
        let mut p = energy_pipeline();

        let mut published = Vec::new();
        for (t, raw) in [(0.0, 0.0), (1.0, 5000.0), (2.0, 5000.0), (130.0, 5000.0)] {
            if p.process(&frame(t, &[(ENERGY, raw)]), &sink).unwrap().is_some() {
                published.push(t);
            }
        }

        assert_eq!(published, vec![1.0, 130.0]);
        assert_eq!(
            sink.values_for("meterbridge/dev/0100010800ff"),
            vec![Value::Number(5.0), Value::Number(5.0)]
        );
        assert_eq!(p.last_publish(), Some(130.0));
    }

    #[test]
    fn skipped_and_processed_are_disjoint() {
        let mut r = ChannelRegistry::new();
        assert!(r.skip(SERIAL));
        assert_eq!(
            r.add_pipeline(ChannelPipeline::new(SERIAL, target(SERIAL), vec![])),
            Err(RegistryError::Skipped(SERIAL.into()))
        );

        r.add_pipeline(energy_pipeline()).unwrap();
        assert!(!r.skip(ENERGY));
        assert!(r.is_processed(ENERGY) && !r.is_skipped(ENERGY));
        assert_eq!(
            r.add_pipeline(energy_pipeline()),
            Err(RegistryError::Duplicate(ENERGY.into()))
        );
    }

    #[test]
    fn unprocessed_channel_is_reported() {
        let sink = MemorySink::new();
        let mut r = ChannelRegistry::new();
        r.skip(SERIAL);
        r.add_pipeline(energy_pipeline()).unwrap();

        r.process_frame(&frame(0.0, &[(ENERGY, 1000.0), (SERIAL, 1.0)]), &sink)
            .unwrap();

        let err = r
            .process_frame(&frame(1.0, &[(ENERGY, 2000.0), (POWER, 7.0)]), &sink)
            .unwrap_err();
        assert_eq!(err, RegistryError::UnprocessedChannels(vec![POWER.into()]));
        // The energy channel was still published.
        assert_eq!(sink.values_for(&target(ENERGY).topic).len(), 2);
    }

    #[test]
    fn missing_channel_is_reported() {
        let sink = MemorySink::new();
        let mut r = ChannelRegistry::new();
        r.add_pipeline(energy_pipeline()).unwrap();
        r.add_pipeline(ChannelPipeline::new(POWER, target(POWER), vec![]))
            .unwrap();

        let err = r
            .process_frame(&frame(0.0, &[(POWER, 7.0)]), &sink)
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingChannels(vec![ENERGY.into()]));
        assert_eq!(sink.values_for(&target(POWER).topic), vec![Value::Number(7.0)]);
    }

    #[test]
    fn failing_pipeline_does_not_stop_siblings() {
        let sink = MemorySink::new();
        let mut r = ChannelRegistry::new();
        // Runs first and fails: the status channel is not in the frame.
        r.add_pipeline(ChannelPipeline::new(
            POWER,
            target(POWER),
            vec![Operation::EnergyMeterSign(EnergyMeterSignWorkaround::new(
                "0100020800ff",
            ))],
        ))
        .unwrap();
        r.add_pipeline(energy_pipeline()).unwrap();

        let err = r
            .process_frame(&frame(0.0, &[(ENERGY, 5000.0), (POWER, 7.0)]), &sink)
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Operation {
                ref channel,
                source: OperationError::RequiredChannelMissing { .. }
            } if channel == POWER
        ));
        assert_eq!(sink.values_for(&target(ENERGY).topic), vec![Value::Number(5.0)]);
    }

    #[test]
    fn describe_lists_skipped_and_pipelines() {
        let mut r = ChannelRegistry::new();
        r.skip(SERIAL);
        r.add_pipeline(energy_pipeline()).unwrap();
        let lines = r.describe();
        assert_eq!(lines[0], "Skipped: 0100000009ff");
        assert!(lines.contains(&"  channel: 0100010800ff".to_string()));
        assert!(lines.contains(&"    - Refresh Action: 2 minutes".to_string()));
    }
}
