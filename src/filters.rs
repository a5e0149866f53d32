//! Built-in filters.
//!
//! Small stages that exercise the [`Filter`] contract; real pipelines add
//! their own (encoders, scalers, noise reduction) the same way.

use crate::buffer::{MediaBuffer, flags};
use crate::error::{Error, Result};
use crate::filter::{ControlReply, Filter, FilterControl};

/// Forwards the first pending input unchanged.
///
/// Disabling via [`FilterControl::SetEnabled`] turns the stage into a
/// frame sink: inputs are consumed and dropped.
pub struct PassThrough {
    enabled: bool,
}

impl PassThrough {
    /// Create an enabled pass-through.
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

impl Default for PassThrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PassThrough {
    fn process(&mut self, inputs: &mut [Option<MediaBuffer>]) -> Result<Option<MediaBuffer>> {
        let buf = inputs.iter_mut().find_map(Option::take);
        if self.enabled { Ok(buf) } else { Ok(None) }
    }

    fn control(&mut self, req: FilterControl) -> Result<ControlReply> {
        match req {
            FilterControl::SetEnabled(on) => {
                self.enabled = on;
                Ok(ControlReply::Ack)
            }
            FilterControl::GetEnabled => Ok(ControlReply::Enabled(self.enabled)),
            _ => Err(Error::UnsupportedControl),
        }
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Forwards only buffers flagged as key frames while active.
///
/// Useful in front of a late-joining consumer that must start on a sync
/// point. When inactive, everything passes.
pub struct KeyFrameGate {
    active: bool,
}

impl KeyFrameGate {
    /// Create a gate; `active` decides whether gating starts engaged.
    pub fn new(active: bool) -> Self {
        Self { active }
    }
}

impl Filter for KeyFrameGate {
    fn process(&mut self, inputs: &mut [Option<MediaBuffer>]) -> Result<Option<MediaBuffer>> {
        let Some(buf) = inputs.iter_mut().find_map(Option::take) else {
            return Ok(None);
        };
        if !self.active || buf.has_flags(flags::KEY_FRAME) {
            Ok(Some(buf))
        } else {
            Ok(None)
        }
    }

    fn control(&mut self, req: FilterControl) -> Result<ControlReply> {
        match req {
            FilterControl::SetEnabled(on) => {
                self.active = on;
                Ok(ControlReply::Ack)
            }
            FilterControl::GetEnabled => Ok(ControlReply::Enabled(self.active)),
            _ => Err(Error::UnsupportedControl),
        }
    }

    fn name(&self) -> &str {
        "keyframe-gate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;

    fn buf_with_flags(mask: u32) -> MediaBuffer {
        let buf = MediaBuffer::alloc(16, MemoryType::Heap).unwrap();
        buf.set_user_flags(mask);
        buf
    }

    #[test]
    fn test_passthrough_forwards() {
        let mut f = PassThrough::new();
        let mut inputs = vec![Some(buf_with_flags(0))];
        let out = f.process(&mut inputs).unwrap();
        assert!(out.is_some());
        assert!(inputs[0].is_none()); // consumed
    }

    #[test]
    fn test_passthrough_disabled_drops() {
        let mut f = PassThrough::new();
        assert_eq!(
            f.control(FilterControl::SetEnabled(false)).unwrap(),
            ControlReply::Ack
        );
        let mut inputs = vec![Some(buf_with_flags(0))];
        assert!(f.process(&mut inputs).unwrap().is_none());
        assert_eq!(
            f.control(FilterControl::GetEnabled).unwrap(),
            ControlReply::Enabled(false)
        );
    }

    #[test]
    fn test_passthrough_unknown_control_fails_without_side_effects() {
        let mut f = PassThrough::new();
        assert!(matches!(
            f.control(FilterControl::SetParam { id: 9, value: 1 }),
            Err(Error::UnsupportedControl)
        ));
        assert_eq!(
            f.control(FilterControl::GetEnabled).unwrap(),
            ControlReply::Enabled(true)
        );
    }

    #[test]
    fn test_keyframe_gate() {
        let mut f = KeyFrameGate::new(true);

        let mut delta = vec![Some(buf_with_flags(0))];
        assert!(f.process(&mut delta).unwrap().is_none());

        let mut key = vec![Some(buf_with_flags(flags::KEY_FRAME))];
        assert!(f.process(&mut key).unwrap().is_some());

        f.control(FilterControl::SetEnabled(false)).unwrap();
        let mut delta = vec![Some(buf_with_flags(0))];
        assert!(f.process(&mut delta).unwrap().is_some());
    }
}
