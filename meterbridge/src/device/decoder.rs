/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Frame decoder contract and the multi-checksum decoder group.
//!
//! The protocol parser lives outside this crate.  A device only needs to
//! push bytes in and pull frames out; checksum verification is the
//! decoder's job.

use tracing::debug;

use crate::frame::Frame;

use super::error::{ChecksumError, DeviceError};

/// Stream decoder for one checksum algorithm.
pub trait FrameDecoder: Send {
    /// Algorithm name, for logging.
    fn name(&self) -> &str;

    fn add_bytes(&mut self, bytes: &[u8]);

    /// Next complete frame, if one is buffered.
    fn try_get_frame(&mut self) -> Result<Option<Frame>, ChecksumError>;

    /// Drops buffered bytes and resynchronizes.
    fn clear(&mut self);
}

/// Runs several decoders side by side on the same byte stream.
///
/// Meters differ in the checksum algorithm they use.  Until the first frame
/// is processed every configured algorithm is tried; afterwards the group is
/// locked to the decoder that produced that frame.
pub struct DecoderGroup {
    decoders: Vec<Box<dyn FrameDecoder>>,
    last_producer: Option<usize>,
    locked: bool,
}

impl DecoderGroup {
    pub fn new(decoders: Vec<Box<dyn FrameDecoder>>) -> Self {
        Self {
            decoders,
            last_producer: None,
            locked: false,
        }
    }

    /// One decoder per configured checksum algorithm, in configuration
    /// order.  `factory` returns `None` for algorithms it cannot build.
    ///
    /// # Errors
    /// [`DeviceError::Decoder`] if `checksums` is empty or names an
    /// algorithm the factory does not know.
    pub fn for_checksums<F>(checksums: &[String], mut factory: F) -> Result<Self, DeviceError>
    where
        F: FnMut(&str) -> Option<Box<dyn FrameDecoder>>,
    {
        if checksums.is_empty() {
            return Err(DeviceError::Decoder("no checksum algorithm configured".into()));
        }
        let decoders = checksums
            .iter()
            .map(|name| {
                factory(name).ok_or_else(|| {
                    DeviceError::Decoder(format!("no decoder for checksum '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(decoders))
    }

    pub fn names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        for decoder in &mut self.decoders {
            decoder.add_bytes(bytes);
        }
    }

    /// Returns the frame produced by exactly one decoder.
    ///
    /// # Errors
    /// * [`DeviceError::Checksum`] if every decoder reported a checksum
    ///   mismatch;
    /// * [`DeviceError::Decoder`] if more than one decoder produced a frame.
    pub fn try_get_frame(&mut self) -> Result<Option<Frame>, DeviceError> {
        let mut frames = Vec::new();
        let mut first_error = None;
        let mut failed = 0;

        for (i, decoder) in self.decoders.iter_mut().enumerate() {
            match decoder.try_get_frame() {
                Ok(Some(frame)) => frames.push((i, frame)),
                Ok(None) => {}
                Err(err) => {
                    debug!(
                        decoder = %decoder.name(),
                        expected = err.expected,
                        actual = err.actual,
                        "checksum mismatch"
                    );
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if frames.len() > 1 {
            let names: Vec<&str> = frames.iter().map(|(i, _)| self.decoders[*i].name()).collect();
            return Err(DeviceError::Decoder(format!(
                "several decoders produced a frame at once: {}",
                names.join(", ")
            )));
        }

        if let Some((i, frame)) = frames.pop() {
            self.last_producer = Some(i);
            return Ok(Some(frame));
        }

        match first_error {
            Some(err) if failed == self.decoders.len() => Err(err.into()),
            _ => Ok(None),
        }
    }

    /// Keeps only the decoder that produced the last frame.
    pub fn lock_in(&mut self) {
        if self.locked {
            return;
        }
        if let Some(i) = self.last_producer {
            let decoder = self.decoders.swap_remove(i);
            debug!(decoder = %decoder.name(), "locked in decoder");
            self.decoders = vec![decoder];
            self.last_producer = Some(0);
            self.locked = true;
        }
    }

    pub fn clear(&mut self) {
        for decoder in &mut self.decoders {
            decoder.clear();
        }
    }
}

impl std::fmt::Debug for DecoderGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderGroup")
            .field("decoders", &self.names())
            .field("locked", &self.locked)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Decoder fed by a script instead of bytes.  Every call to `add_bytes`
    /// releases the next scripted outcome.
    #[derive(Clone, Default)]
    pub struct ScriptedDecoder {
        pub name: String,
        pub script: Arc<Mutex<VecDeque<Result<Frame, ChecksumError>>>>,
        ready: Arc<Mutex<VecDeque<Result<Frame, ChecksumError>>>>,
        pub cleared: Arc<Mutex<usize>>,
    }

    impl ScriptedDecoder {
        pub fn new(name: &str, script: Vec<Result<Frame, ChecksumError>>) -> Self {
            Self {
                name: name.to_string(),
                script: Arc::new(Mutex::new(script.into())),
                ..Self::default()
            }
        }
    }

    impl FrameDecoder for ScriptedDecoder {
        fn name(&self) -> &str {
            &self.name
        }

        fn add_bytes(&mut self, _bytes: &[u8]) {
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                self.ready.lock().unwrap().push_back(next);
            }
        }

        fn try_get_frame(&mut self) -> Result<Option<Frame>, ChecksumError> {
            self.ready.lock().unwrap().pop_front().transpose()
        }

        fn clear(&mut self) {
            self.ready.lock().unwrap().clear();
            *self.cleared.lock().unwrap() += 1;
        }
    }
}
