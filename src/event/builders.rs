//! Event Builders
//!
//! Fluent construction for key and motion events. Every field has a sane
//! default so call sites only spell out what matters to them; the event id
//! defaults to a fresh value from [`next_event_id`].

use crate::event::coords::{PointerCoords, PointerProperties};
use crate::event::key::KeyEvent;
use crate::event::motion::{MotionEvent, INVALID_CURSOR_POSITION};
use crate::event::transform::Transform;
use crate::event::{
    axis, meta, next_event_id, DisplayId, KeyAction, KeyFlag, MotionAction, MotionClassification,
    MotionFlag, Signature, Source, ToolType, INVALID_SIGNATURE, MAX_POINTER_ID,
};
use enumflags2::BitFlags;

/// Builder for one pointer of a motion event
#[derive(Debug, Clone)]
pub struct PointerBuilder {
    properties: PointerProperties,
    axes: Vec<(u32, f32)>,
    is_resampled: bool,
}

impl PointerBuilder {
    /// Start a pointer with the given id and tool.
    ///
    /// Panics when `id` is outside `[0, MAX_POINTER_ID]`; ids beyond that
    /// range cannot participate in pointer-id sets.
    pub fn new(id: i32, tool_type: ToolType) -> Self {
        assert!(
            (0..=MAX_POINTER_ID).contains(&id),
            "pointer id {id} out of range"
        );
        Self {
            properties: PointerProperties::new(id, tool_type),
            axes: Vec::new(),
            is_resampled: false,
        }
    }

    /// Set the X position
    pub fn x(self, x: f32) -> Self {
        self.axis(axis::X, x)
    }

    /// Set the Y position
    pub fn y(self, y: f32) -> Self {
        self.axis(axis::Y, y)
    }

    /// Set an arbitrary axis value
    pub fn axis(mut self, axis_id: u32, value: f32) -> Self {
        self.axes.push((axis_id, value));
        self
    }

    /// Mark the pointer's coordinates as interpolated
    pub fn resampled(mut self, is_resampled: bool) -> Self {
        self.is_resampled = is_resampled;
        self
    }

    fn build(self) -> (PointerProperties, PointerCoords) {
        let mut coords = PointerCoords::new();
        for (axis_id, value) in self.axes {
            if let Err(error) = coords.set_axis_value(axis_id, value) {
                panic!("invalid pointer axis {axis_id}: {error}");
            }
        }
        coords.is_resampled = self.is_resampled;
        (self.properties, coords)
    }
}

/// Builder for [`MotionEvent`]
#[derive(Debug, Clone)]
pub struct MotionEventBuilder {
    id: Option<i32>,
    device_id: i32,
    source: Source,
    display_id: DisplayId,
    signature: Signature,
    action: MotionAction,
    action_button: u32,
    flags: BitFlags<MotionFlag>,
    edge_flags: u32,
    meta_state: u32,
    button_state: u32,
    classification: MotionClassification,
    transform: Transform,
    x_precision: f32,
    y_precision: f32,
    raw_x_cursor_position: f32,
    raw_y_cursor_position: f32,
    raw_transform: Transform,
    down_time: i64,
    event_time: i64,
    pointers: Vec<PointerBuilder>,
}

impl MotionEventBuilder {
    /// Start a motion event with the given action and source
    pub fn new(action: MotionAction, source: Source) -> Self {
        Self {
            id: None,
            device_id: 0,
            source,
            display_id: DisplayId::DEFAULT,
            signature: INVALID_SIGNATURE,
            action,
            action_button: 0,
            flags: BitFlags::empty(),
            edge_flags: 0,
            meta_state: meta::NONE,
            button_state: 0,
            classification: MotionClassification::None,
            transform: Transform::IDENTITY,
            x_precision: 0.0,
            y_precision: 0.0,
            raw_x_cursor_position: INVALID_CURSOR_POSITION,
            raw_y_cursor_position: INVALID_CURSOR_POSITION,
            raw_transform: Transform::IDENTITY,
            down_time: 0,
            event_time: 0,
            pointers: Vec::new(),
        }
    }

    /// Use a fixed event id instead of a fresh one
    pub fn id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the originating device id
    pub fn device_id(mut self, device_id: i32) -> Self {
        self.device_id = device_id;
        self
    }

    /// Set the target display
    pub fn display_id(mut self, display_id: DisplayId) -> Self {
        self.display_id = display_id;
        self
    }

    /// Attach an integrity tag
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Set the button for a button press/release action
    pub fn action_button(mut self, action_button: u32) -> Self {
        self.action_button = action_button;
        self
    }

    /// Replace all event flags
    pub fn flags(mut self, flags: BitFlags<MotionFlag>) -> Self {
        self.flags = flags;
        self
    }

    /// Add one event flag
    pub fn add_flag(mut self, flag: MotionFlag) -> Self {
        self.flags |= flag;
        self
    }

    /// Set the edge flags
    pub fn edge_flags(mut self, edge_flags: u32) -> Self {
        self.edge_flags = edge_flags;
        self
    }

    /// Set the meta-key state
    pub fn meta_state(mut self, meta_state: u32) -> Self {
        self.meta_state = meta_state;
        self
    }

    /// Set the pressed-button state
    pub fn button_state(mut self, button_state: u32) -> Self {
        self.button_state = button_state;
        self
    }

    /// Set the gesture classification
    pub fn classification(mut self, classification: MotionClassification) -> Self {
        self.classification = classification;
        self
    }

    /// Set the window transform
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the raw transform
    pub fn raw_transform(mut self, raw_transform: Transform) -> Self {
        self.raw_transform = raw_transform;
        self
    }

    /// Set the hardware precision hints
    pub fn precision(mut self, x_precision: f32, y_precision: f32) -> Self {
        self.x_precision = x_precision;
        self.y_precision = y_precision;
        self
    }

    /// Set the cursor position in untransformed coordinates
    pub fn cursor_position(mut self, raw_x: f32, raw_y: f32) -> Self {
        self.raw_x_cursor_position = raw_x;
        self.raw_y_cursor_position = raw_y;
        self
    }

    /// Set the time of the initial down event
    pub fn down_time(mut self, down_time: i64) -> Self {
        self.down_time = down_time;
        self
    }

    /// Set the event time
    pub fn event_time(mut self, event_time: i64) -> Self {
        self.event_time = event_time;
        self
    }

    /// Add a pointer
    pub fn pointer(mut self, pointer: PointerBuilder) -> Self {
        self.pointers.push(pointer);
        self
    }

    /// Build the event.
    ///
    /// # Panics
    ///
    /// Panics when no pointer was added or a pointer carries an invalid axis.
    pub fn build(self) -> MotionEvent {
        assert!(
            !self.pointers.is_empty(),
            "a motion event requires at least one pointer"
        );
        let (pointer_properties, pointer_coords): (Vec<_>, Vec<_>) = self
            .pointers
            .into_iter()
            .map(PointerBuilder::build)
            .unzip();
        MotionEvent::from_parts(
            self.id.unwrap_or_else(next_event_id),
            self.device_id,
            self.source,
            self.display_id,
            self.signature,
            self.action,
            self.action_button,
            self.flags,
            self.edge_flags,
            self.meta_state,
            self.button_state,
            self.classification,
            self.transform,
            self.x_precision,
            self.y_precision,
            self.raw_x_cursor_position,
            self.raw_y_cursor_position,
            self.raw_transform,
            self.down_time,
            self.event_time,
            pointer_properties,
            pointer_coords,
        )
    }
}

/// Builder for [`KeyEvent`]
#[derive(Debug, Clone)]
pub struct KeyEventBuilder {
    id: Option<i32>,
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

impl KeyEventBuilder {
    /// Start a key event with the given action and source
    pub fn new(action: KeyAction, source: Source) -> Self {
        Self {
            id: None,
            device_id: 0,
            source,
            display_id: DisplayId::INVALID,
            signature: INVALID_SIGNATURE,
            action,
            flags: BitFlags::empty(),
            key_code: 0,
            scan_code: 0,
            meta_state: meta::NONE,
            repeat_count: 0,
            down_time: 0,
            event_time: 0,
        }
    }

    /// Use a fixed event id instead of a fresh one
    pub fn id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the originating device id
    pub fn device_id(mut self, device_id: i32) -> Self {
        self.device_id = device_id;
        self
    }

    /// Set the target display
    pub fn display_id(mut self, display_id: DisplayId) -> Self {
        self.display_id = display_id;
        self
    }

    /// Attach an integrity tag
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Add one event flag
    pub fn add_flag(mut self, flag: KeyFlag) -> Self {
        self.flags |= flag;
        self
    }

    /// Set the mapped key code
    pub fn key_code(mut self, key_code: i32) -> Self {
        self.key_code = key_code;
        self
    }

    /// Set the hardware scan code
    pub fn scan_code(mut self, scan_code: i32) -> Self {
        self.scan_code = scan_code;
        self
    }

    /// Set the meta-key state
    pub fn meta_state(mut self, meta_state: u32) -> Self {
        self.meta_state = meta_state;
        self
    }

    /// Set the auto-repeat count
    pub fn repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    /// Set the time of the initial down event
    pub fn down_time(mut self, down_time: i64) -> Self {
        self.down_time = down_time;
        self
    }

    /// Set the event time
    pub fn event_time(mut self, event_time: i64) -> Self {
        self.event_time = event_time;
        self
    }

    /// Build the event
    pub fn build(self) -> KeyEvent {
        KeyEvent::from_parts(
            self.id.unwrap_or_else(next_event_id),
            self.device_id,
            self.source,
            self.display_id,
            self.signature,
            self.action,
            self.flags,
            self.key_code,
            self.scan_code,
            self.meta_state,
            self.repeat_count,
            self.down_time,
            self.event_time,
        )
    }
}
