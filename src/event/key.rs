//! Key Events
//!
//! A key event is a flat record of a single press or release; unlike motion
//! events it carries no samples and no coordinate state.

use crate::error::{EvhubError, Result};
use crate::event::{parcel, DisplayId, KeyAction, KeyFlag, Signature, Source};
use bytes::BufMut;
use enumflags2::BitFlags;

/// Key press or release event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    id: i32,
    device_id: i32,
    source: Source,
    display_id: DisplayId,
    signature: Signature,
    action: KeyAction,
    flags: BitFlags<KeyFlag>,
    key_code: i32,
    scan_code: i32,
    meta_state: u32,
    repeat_count: u32,
    down_time: i64,
    event_time: i64,
}

#[allow(clippy::too_many_arguments)]
impl KeyEvent {
    pub(crate) fn from_parts(
        id: i32,
        device_id: i32,
        source: Source,
        display_id: DisplayId,
        signature: Signature,
        action: KeyAction,
        flags: BitFlags<KeyFlag>,
        key_code: i32,
        scan_code: i32,
        meta_state: u32,
        repeat_count: u32,
        down_time: i64,
        event_time: i64,
    ) -> Self {
        Self {
            id,
            device_id,
            source,
            display_id,
            signature,
            action,
            flags,
            key_code,
            scan_code,
            meta_state,
            repeat_count,
            down_time,
            event_time,
        }
    }

    /// Event id
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Originating device id
    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    /// Event source
    pub fn source(&self) -> Source {
        self.source
    }

    /// Replace the event source
    pub fn set_source(&mut self, source: Source) {
        self.source = source;
    }

    /// Target display
    pub fn display_id(&self) -> DisplayId {
        self.display_id
    }

    /// Replace the target display
    pub fn set_display_id(&mut self, display_id: DisplayId) {
        self.display_id = display_id;
    }

    /// Integrity tag bytes
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Press or release
    pub fn action(&self) -> KeyAction {
        self.action
    }

    /// Event flags
    pub fn flags(&self) -> BitFlags<KeyFlag> {
        self.flags
    }

    /// Mapped key code
    pub fn key_code(&self) -> i32 {
        self.key_code
    }

    /// Hardware scan code
    pub fn scan_code(&self) -> i32 {
        self.scan_code
    }

    /// Meta-key state at event time
    pub fn meta_state(&self) -> u32 {
        self.meta_state
    }

    /// Number of hardware auto-repeats so far; zero for the initial press
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// Time of the initial down event
    pub fn down_time(&self) -> i64 {
        self.down_time
    }

    /// Time of this event
    pub fn event_time(&self) -> i64 {
        self.event_time
    }

    /// Serialize to a byte channel
    pub fn write_to_parcel(&self, out: &mut impl BufMut) {
        out.put_i32(self.id);
        out.put_i32(self.device_id);
        out.put_u32(self.source.0);
        out.put_i32(self.display_id.0);
        out.put_slice(&self.signature);
        out.put_u32(self.action as u32);
        out.put_u32(self.flags.bits());
        out.put_i32(self.key_code);
        out.put_i32(self.scan_code);
        out.put_u32(self.meta_state);
        out.put_u32(self.repeat_count);
        out.put_i64(self.down_time);
        out.put_i64(self.event_time);
    }

    /// Deserialize from a byte channel
    pub fn read_from_parcel(buf: &mut impl bytes::Buf) -> Result<Self> {
        let id = parcel::read_i32(buf, "event id")?;
        let device_id = parcel::read_i32(buf, "device id")?;
        let source = Source(parcel::read_u32(buf, "source")?);
        let display_id = DisplayId(parcel::read_i32(buf, "display id")?);
        let signature: Signature = parcel::read_array(buf, "signature")?;
        let action_code = parcel::read_u32(buf, "action")?;
        let action = KeyAction::from_u32(action_code)
            .ok_or_else(|| EvhubError::MalformedParcel(format!("bad action {action_code}")))?;
        let flag_bits = parcel::read_u32(buf, "flags")?;
        let flags = BitFlags::<KeyFlag>::from_bits(flag_bits)
            .map_err(|_| EvhubError::MalformedParcel(format!("bad flags {flag_bits:#x}")))?;
        Ok(Self {
            id,
            device_id,
            source,
            display_id,
            signature,
            action,
            flags,
            key_code: parcel::read_i32(buf, "key code")?,
            scan_code: parcel::read_i32(buf, "scan code")?,
            meta_state: parcel::read_u32(buf, "meta state")?,
            repeat_count: parcel::read_u32(buf, "repeat count")?,
            down_time: parcel::read_i64(buf, "down time")?,
            event_time: parcel::read_i64(buf, "event time")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builders::KeyEventBuilder;
    use crate::event::{meta, next_event_id};
    use bytes::BytesMut;

    const DOWN_TIME: i64 = 50;
    const EVENT_TIME: i64 = 100;

    fn key_down(id: i32) -> KeyEvent {
        KeyEventBuilder::new(KeyAction::Down, Source::KEYBOARD)
            .id(id)
            .device_id(2)
            .add_flag(KeyFlag::FromSystem)
            .add_flag(KeyFlag::SoftKeyboard)
            .key_code(30)
            .scan_code(30)
            .meta_state(meta::ALT_ON | meta::SHIFT_ON)
            .repeat_count(1)
            .down_time(DOWN_TIME)
            .event_time(EVENT_TIME)
            .build()
    }

    #[test]
    fn test_properties() {
        let id = next_event_id();
        let mut event = key_down(id);

        assert_eq!(event.id(), id);
        assert_eq!(event.device_id(), 2);
        assert_eq!(event.source(), Source::KEYBOARD);
        assert_eq!(event.display_id(), DisplayId::INVALID);
        assert_eq!(event.action(), KeyAction::Down);
        assert_eq!(event.flags(), KeyFlag::FromSystem | KeyFlag::SoftKeyboard);
        assert_eq!(event.key_code(), 30);
        assert_eq!(event.scan_code(), 30);
        assert_eq!(event.meta_state(), meta::ALT_ON | meta::SHIFT_ON);
        assert_eq!(event.repeat_count(), 1);
        assert_eq!(event.down_time(), DOWN_TIME);
        assert_eq!(event.event_time(), EVENT_TIME);

        event.set_source(Source::GAMEPAD);
        assert_eq!(event.source(), Source::GAMEPAD);

        event.set_display_id(DisplayId(1));
        assert_eq!(event.display_id(), DisplayId(1));
    }

    #[test]
    fn test_parcel_round_trip() {
        let event = key_down(next_event_id());

        let mut parcel = BytesMut::new();
        event.write_to_parcel(&mut parcel);
        let out = KeyEvent::read_from_parcel(&mut parcel.freeze()).unwrap();
        assert_eq!(out, event);
    }

    #[test]
    fn test_truncated_parcel_is_rejected() {
        let event = key_down(next_event_id());

        let mut parcel = BytesMut::new();
        event.write_to_parcel(&mut parcel);
        let full = parcel.freeze();
        let mut truncated = full.slice(0..full.len() - 4);
        assert!(KeyEvent::read_from_parcel(&mut truncated).is_err());
    }
}
