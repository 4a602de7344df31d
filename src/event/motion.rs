//! Motion Events
//!
//! A motion event aggregates per-pointer samples over time: the last sample
//! is "current", earlier ones are history. Raw sensor values are stored
//! untouched; displayed values are computed on demand by pushing the stored
//! values through the window or raw transform according to the event's
//! source class:
//!
//! - pointer sources (touchscreen, stylus, absolute mouse): rotate, scale,
//!   and translate; relative axes rotate and scale only
//! - joystick, touchpad, and relative-mouse sources: identity, never touched
//! - directionless relative sources (trackball, touch navigation): rotate
//!   and scale, never translate

use crate::error::{EvhubError, Result};
use crate::event::coords::{PointerCoords, PointerProperties};
use crate::event::split::{resolve_split, PointerIdSet};
use crate::event::transform::{round_transformed, Transform};
use crate::event::{
    axis, parcel, DisplayId, MotionAction, MotionClassification, MotionFlag, Signature, Source,
};
use bytes::BufMut;
use enumflags2::BitFlags;

/// Cursor coordinate carried by events without a cursor
pub const INVALID_CURSOR_POSITION: f32 = f32::NAN;

/// Maximum simultaneous pointers in one event
pub const MAX_POINTERS: usize = 16;

// Parcel sanity bound; a legitimate event never batches this much history.
const MAX_PARCEL_SAMPLES: u32 = 0xffff;

/// Pointer motion event with sample history and coordinate transforms
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvent {
    id: i32,
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
    pointer_properties: Vec<PointerProperties>,
    sample_event_times: Vec<i64>,
    // Flattened: sample * pointer_count + pointer.
    sample_coords: Vec<PointerCoords>,
}

#[allow(clippy::too_many_arguments)]
impl MotionEvent {
    pub(crate) fn from_parts(
        id: i32,
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
        pointer_properties: Vec<PointerProperties>,
        pointer_coords: Vec<PointerCoords>,
    ) -> Self {
        debug_assert!(!pointer_properties.is_empty());
        debug_assert_eq!(pointer_properties.len(), pointer_coords.len());
        Self {
            id,
            device_id,
            source,
            display_id,
            signature,
            action,
            action_button,
            flags,
            edge_flags,
            meta_state,
            button_state,
            classification,
            transform,
            x_precision,
            y_precision,
            raw_x_cursor_position,
            raw_y_cursor_position,
            raw_transform,
            down_time,
            pointer_properties,
            sample_event_times: vec![event_time],
            sample_coords: pointer_coords,
        }
    }

    /// Event id; reassigned by every [`Self::add_sample`]
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

    /// Event action
    pub fn action(&self) -> MotionAction {
        self.action
    }

    /// Replace the event action
    pub fn set_action(&mut self, action: MotionAction) {
        self.action = action;
    }

    /// Button associated with a button press/release action
    pub fn action_button(&self) -> u32 {
        self.action_button
    }

    /// Event flags
    pub fn flags(&self) -> BitFlags<MotionFlag> {
        self.flags
    }

    /// Edge flags for pointers crossing the display edge
    pub fn edge_flags(&self) -> u32 {
        self.edge_flags
    }

    /// Meta-key state at event time
    pub fn meta_state(&self) -> u32 {
        self.meta_state
    }

    /// Replace the meta-key state
    pub fn set_meta_state(&mut self, meta_state: u32) {
        self.meta_state = meta_state;
    }

    /// Pressed-button state at event time
    pub fn button_state(&self) -> u32 {
        self.button_state
    }

    /// Gesture classification
    pub fn classification(&self) -> MotionClassification {
        self.classification
    }

    /// Window transform (raw display space to window space)
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Raw transform (sensor space to raw display space)
    pub fn raw_transform(&self) -> &Transform {
        &self.raw_transform
    }

    /// X precision hint of the source hardware
    pub fn x_precision(&self) -> f32 {
        self.x_precision
    }

    /// Y precision hint of the source hardware
    pub fn y_precision(&self) -> f32 {
        self.y_precision
    }

    /// Time of the initial down event
    pub fn down_time(&self) -> i64 {
        self.down_time
    }

    /// Number of pointers; at least one
    pub fn pointer_count(&self) -> usize {
        self.pointer_properties.len()
    }

    /// Properties of the pointer at `pointer_index`
    pub fn pointer_properties(&self, pointer_index: usize) -> &PointerProperties {
        &self.pointer_properties[pointer_index]
    }

    /// Id of the pointer at `pointer_index`
    pub fn pointer_id(&self, pointer_index: usize) -> i32 {
        self.pointer_properties[pointer_index].id
    }

    /// Tool of the pointer at `pointer_index`
    pub fn tool_type(&self, pointer_index: usize) -> crate::event::ToolType {
        self.pointer_properties[pointer_index].tool_type
    }

    /// Number of historical (non-current) samples
    pub fn history_size(&self) -> usize {
        self.sample_event_times.len() - 1
    }

    /// Time of the current sample
    pub fn event_time(&self) -> i64 {
        self.sample_event_times[self.sample_event_times.len() - 1]
    }

    /// Time of a historical sample; `history_index == history_size` is the
    /// current sample
    pub fn historical_event_time(&self, history_index: usize) -> i64 {
        self.sample_event_times[history_index]
    }

    /// All stored samples, flattened sample-major
    pub fn sample_pointer_coords(&self) -> &[PointerCoords] {
        &self.sample_coords
    }

    /// Untransformed coordinates of the current sample
    pub fn raw_pointer_coords(&self, pointer_index: usize) -> &PointerCoords {
        self.historical_raw_pointer_coords(pointer_index, self.history_size())
    }

    /// Untransformed coordinates of a historical sample;
    /// `history_index == history_size` addresses the current sample
    pub fn historical_raw_pointer_coords(
        &self,
        pointer_index: usize,
        history_index: usize,
    ) -> &PointerCoords {
        &self.sample_coords[history_index * self.pointer_count() + pointer_index]
    }

    /// Whether a sample's coordinates were synthetically interpolated
    pub fn is_resampled(&self, pointer_index: usize, history_index: usize) -> bool {
        self.historical_raw_pointer_coords(pointer_index, history_index)
            .is_resampled
    }

    // ---------------------------------------------------------------------
    // Transformed getters
    // ---------------------------------------------------------------------

    fn transformed_xy(&self, transform: &Transform, x: f32, y: f32) -> (f32, f32) {
        if self.source.disregards_transform() {
            (x, y)
        } else if self.source.disregards_offset() {
            transform.transform_vector(x, y)
        } else {
            transform.transform_point(x, y)
        }
    }

    fn transformed_axis_value(
        &self,
        transform: &Transform,
        axis_id: u32,
        coords: &PointerCoords,
    ) -> f32 {
        if self.source.disregards_transform() {
            return coords.axis_value(axis_id);
        }
        match axis_id {
            axis::X | axis::Y => {
                let (x, y) = self.transformed_xy(transform, coords.x(), coords.y());
                round_transformed(if axis_id == axis::X { x } else { y })
            }
            axis::RELATIVE_X | axis::RELATIVE_Y => {
                let (dx, dy) = transform.transform_vector(
                    coords.axis_value(axis::RELATIVE_X),
                    coords.axis_value(axis::RELATIVE_Y),
                );
                round_transformed(if axis_id == axis::RELATIVE_X { dx } else { dy })
            }
            axis::ORIENTATION => self.transformed_orientation(transform, coords),
            _ => coords.axis_value(axis_id),
        }
    }

    fn transformed_orientation(&self, transform: &Transform, coords: &PointerCoords) -> f32 {
        if !self.flags.contains(MotionFlag::SupportsOrientation) {
            return 0.0;
        }
        let directional = self
            .flags
            .contains(MotionFlag::SupportsDirectionalOrientation);
        transform.transform_angle(coords.axis_value(axis::ORIENTATION), directional)
    }

    /// Axis value in raw display space for a historical sample
    pub fn historical_raw_axis_value(
        &self,
        axis_id: u32,
        pointer_index: usize,
        history_index: usize,
    ) -> f32 {
        let coords = self.historical_raw_pointer_coords(pointer_index, history_index);
        self.transformed_axis_value(&self.raw_transform, axis_id, coords)
    }

    /// Axis value in window space for a historical sample
    pub fn historical_axis_value(
        &self,
        axis_id: u32,
        pointer_index: usize,
        history_index: usize,
    ) -> f32 {
        let coords = self.historical_raw_pointer_coords(pointer_index, history_index);
        self.transformed_axis_value(&self.transform, axis_id, coords)
    }

    /// Axis value in raw display space for the current sample
    pub fn raw_axis_value(&self, axis_id: u32, pointer_index: usize) -> f32 {
        self.historical_raw_axis_value(axis_id, pointer_index, self.history_size())
    }

    /// Axis value in window space for the current sample
    pub fn axis_value(&self, axis_id: u32, pointer_index: usize) -> f32 {
        self.historical_axis_value(axis_id, pointer_index, self.history_size())
    }

    /// Current X in raw display space
    pub fn raw_x(&self, pointer_index: usize) -> f32 {
        self.raw_axis_value(axis::X, pointer_index)
    }

    /// Current Y in raw display space
    pub fn raw_y(&self, pointer_index: usize) -> f32 {
        self.raw_axis_value(axis::Y, pointer_index)
    }

    /// Current X in window space
    pub fn x(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::X, pointer_index)
    }

    /// Current Y in window space
    pub fn y(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::Y, pointer_index)
    }

    /// Historical X in raw display space
    pub fn historical_raw_x(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_raw_axis_value(axis::X, pointer_index, history_index)
    }

    /// Historical Y in raw display space
    pub fn historical_raw_y(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_raw_axis_value(axis::Y, pointer_index, history_index)
    }

    /// Historical X in window space
    pub fn historical_x(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_axis_value(axis::X, pointer_index, history_index)
    }

    /// Historical Y in window space
    pub fn historical_y(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_axis_value(axis::Y, pointer_index, history_index)
    }

    /// Current pressure
    pub fn pressure(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::PRESSURE, pointer_index)
    }

    /// Current size
    pub fn size(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::SIZE, pointer_index)
    }

    /// Current touch-ellipse major axis
    pub fn touch_major(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::TOUCH_MAJOR, pointer_index)
    }

    /// Current touch-ellipse minor axis
    pub fn touch_minor(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::TOUCH_MINOR, pointer_index)
    }

    /// Current tool-ellipse major axis
    pub fn tool_major(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::TOOL_MAJOR, pointer_index)
    }

    /// Current tool-ellipse minor axis
    pub fn tool_minor(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::TOOL_MINOR, pointer_index)
    }

    /// Current orientation in window space, honoring the orientation flags
    pub fn orientation(&self, pointer_index: usize) -> f32 {
        self.axis_value(axis::ORIENTATION, pointer_index)
    }

    /// Historical variant of [`Self::pressure`]
    pub fn historical_pressure(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_axis_value(axis::PRESSURE, pointer_index, history_index)
    }

    /// Historical variant of [`Self::orientation`]
    pub fn historical_orientation(&self, pointer_index: usize, history_index: usize) -> f32 {
        self.historical_axis_value(axis::ORIENTATION, pointer_index, history_index)
    }

    /// Offset between raw-display X and window X: where raw display origin
    /// lands in window space
    pub fn raw_x_offset(&self) -> f32 {
        self.raw_to_window().tx()
    }

    /// Offset between raw-display Y and window Y
    pub fn raw_y_offset(&self) -> f32 {
        self.raw_to_window().ty()
    }

    // Degenerate raw transforms fall back to identity rather than faulting a
    // getter; they cannot be produced by the display pipeline.
    fn raw_to_window(&self) -> Transform {
        let inverse_raw = self.raw_transform.inverse().unwrap_or_default();
        self.transform.concat(&inverse_raw)
    }

    // ---------------------------------------------------------------------
    // Cursor position
    // ---------------------------------------------------------------------

    /// Cursor X in raw display space, or NaN when the event has no cursor
    pub fn raw_x_cursor_position(&self) -> f32 {
        let (x, _) = self.transformed_xy(
            &self.raw_transform,
            self.raw_x_cursor_position,
            self.raw_y_cursor_position,
        );
        round_transformed(x)
    }

    /// Cursor Y in raw display space, or NaN when the event has no cursor
    pub fn raw_y_cursor_position(&self) -> f32 {
        let (_, y) = self.transformed_xy(
            &self.raw_transform,
            self.raw_x_cursor_position,
            self.raw_y_cursor_position,
        );
        round_transformed(y)
    }

    /// Cursor X in window space, or NaN when the event has no cursor
    pub fn x_cursor_position(&self) -> f32 {
        let (x, _) = self.transformed_xy(
            &self.transform,
            self.raw_x_cursor_position,
            self.raw_y_cursor_position,
        );
        round_transformed(x)
    }

    /// Cursor Y in window space, or NaN when the event has no cursor
    pub fn y_cursor_position(&self) -> f32 {
        let (_, y) = self.transformed_xy(
            &self.transform,
            self.raw_x_cursor_position,
            self.raw_y_cursor_position,
        );
        round_transformed(y)
    }

    /// Place the cursor so that the window-space getters report `(x, y)`
    pub fn set_cursor_position(&mut self, x: f32, y: f32) {
        let inverse = self.transform.inverse().unwrap_or_default();
        let (raw_x, raw_y) = self.transformed_xy(&inverse, x, y);
        self.raw_x_cursor_position = raw_x;
        self.raw_y_cursor_position = raw_y;
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Append a sample, demoting the previous current sample into history
    /// and adopting `event_id` as the event's id.
    ///
    /// # Panics
    ///
    /// Panics when `pointer_coords` does not match the pointer count.
    pub fn add_sample(&mut self, event_time: i64, pointer_coords: &[PointerCoords], event_id: i32) {
        assert_eq!(
            pointer_coords.len(),
            self.pointer_count(),
            "sample pointer count must match the event"
        );
        self.sample_event_times.push(event_time);
        self.sample_coords.extend_from_slice(pointer_coords);
        self.id = event_id;
    }

    /// Shift displayed coordinates by adjusting the window transform's
    /// translation; raw values are unaffected
    pub fn offset_location(&mut self, dx: f32, dy: f32) {
        self.transform
            .set_translation(self.transform.tx() + dx, self.transform.ty() + dy);
    }

    /// Apply a global scale factor to positions, precision hints, and
    /// contact geometry
    pub fn scale(&mut self, factor: f32) {
        self.transform
            .set_translation(self.transform.tx() * factor, self.transform.ty() * factor);
        self.raw_transform.set_translation(
            self.raw_transform.tx() * factor,
            self.raw_transform.ty() * factor,
        );
        self.x_precision *= factor;
        self.y_precision *= factor;
        self.raw_x_cursor_position *= factor;
        self.raw_y_cursor_position *= factor;
        for coords in &mut self.sample_coords {
            coords.scale(factor, factor, factor);
        }
    }

    /// Prepend `t` to the window transform: displayed coordinates are
    /// re-interpreted, raw values stay put
    pub fn apply_window_transform(&mut self, t: &Transform) {
        self.transform = t.concat(&self.transform);
    }

    /// Prepend `t` to both transforms: the underlying content moved, so raw
    /// and displayed coordinates both follow
    pub fn apply_transform(&mut self, t: &Transform) {
        self.transform = t.concat(&self.transform);
        self.raw_transform = t.concat(&self.raw_transform);
    }

    /// Deep copy; with `keep_history == false` only the current sample is
    /// retained and the copy's history size is zero
    pub fn copy(&self, keep_history: bool) -> Self {
        if keep_history {
            return self.clone();
        }
        let mut copy = self.clone();
        let current_start = self.history_size() * self.pointer_count();
        copy.sample_coords = self.sample_coords[current_start..].to_vec();
        copy.sample_event_times = vec![self.event_time()];
        copy
    }

    /// Build a new event restricted to the pointers whose id is in `kept`,
    /// preserving their relative order and re-deriving the action.
    ///
    /// # Panics
    ///
    /// Panics when no pointer of the event is in `kept`.
    pub fn split(&self, kept: &PointerIdSet, new_event_id: i32) -> Self {
        let pointer_ids: Vec<i32> = self.pointer_properties.iter().map(|p| p.id).collect();
        let canceled = self.flags.contains(MotionFlag::Canceled);
        let resolution = resolve_split(self.action, canceled, &pointer_ids, kept);
        assert!(
            !resolution.kept_indices.is_empty(),
            "split must keep at least one pointer"
        );

        let pointer_properties: Vec<PointerProperties> = resolution
            .kept_indices
            .iter()
            .map(|index| self.pointer_properties[*index])
            .collect();
        let pointer_count = self.pointer_count();
        let mut sample_coords =
            Vec::with_capacity(self.sample_event_times.len() * resolution.kept_indices.len());
        for sample in 0..self.sample_event_times.len() {
            for index in &resolution.kept_indices {
                sample_coords.push(self.sample_coords[sample * pointer_count + index]);
            }
        }

        Self {
            id: new_event_id,
            action: resolution.action,
            pointer_properties,
            sample_event_times: self.sample_event_times.clone(),
            sample_coords,
            ..self.clone()
        }
    }

    // ---------------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------------

    /// Serialize to a byte channel
    pub fn write_to_parcel(&self, out: &mut impl BufMut) {
        out.put_i32(self.id);
        out.put_i32(self.device_id);
        out.put_u32(self.source.0);
        out.put_i32(self.display_id.0);
        out.put_slice(&self.signature);
        out.put_u32(self.action.to_code());
        out.put_u32(self.action_button);
        out.put_u32(self.flags.bits());
        out.put_u32(self.edge_flags);
        out.put_u32(self.meta_state);
        out.put_u32(self.button_state);
        out.put_u8(self.classification as u8);
        self.transform.write_to_parcel(out);
        out.put_f32(self.x_precision);
        out.put_f32(self.y_precision);
        out.put_f32(self.raw_x_cursor_position);
        out.put_f32(self.raw_y_cursor_position);
        self.raw_transform.write_to_parcel(out);
        out.put_i64(self.down_time);
        out.put_u32(self.pointer_count() as u32);
        out.put_u32(self.sample_event_times.len() as u32);
        for properties in &self.pointer_properties {
            properties.write_to_parcel(out);
        }
        for (sample, event_time) in self.sample_event_times.iter().enumerate() {
            out.put_i64(*event_time);
            let start = sample * self.pointer_count();
            for coords in &self.sample_coords[start..start + self.pointer_count()] {
                coords.write_to_parcel(out);
            }
        }
    }

    /// Deserialize from a byte channel
    pub fn read_from_parcel(buf: &mut impl bytes::Buf) -> Result<Self> {
        let id = parcel::read_i32(buf, "event id")?;
        let device_id = parcel::read_i32(buf, "device id")?;
        let source = Source(parcel::read_u32(buf, "source")?);
        let display_id = DisplayId(parcel::read_i32(buf, "display id")?);
        let signature: Signature = parcel::read_array(buf, "signature")?;
        let action_code = parcel::read_u32(buf, "action")?;
        let action = MotionAction::from_code(action_code)
            .ok_or_else(|| EvhubError::MalformedParcel(format!("bad action {action_code:#x}")))?;
        let action_button = parcel::read_u32(buf, "action button")?;
        let flag_bits = parcel::read_u32(buf, "flags")?;
        let flags = BitFlags::<MotionFlag>::from_bits(flag_bits)
            .map_err(|_| EvhubError::MalformedParcel(format!("bad flags {flag_bits:#x}")))?;
        let edge_flags = parcel::read_u32(buf, "edge flags")?;
        let meta_state = parcel::read_u32(buf, "meta state")?;
        let button_state = parcel::read_u32(buf, "button state")?;
        let raw_classification = parcel::read_u8(buf, "classification")?;
        let classification = MotionClassification::from_u8(raw_classification).ok_or_else(|| {
            EvhubError::MalformedParcel(format!("bad classification {raw_classification}"))
        })?;
        let transform = Transform::read_from_parcel(buf)?;
        let x_precision = parcel::read_f32(buf, "x precision")?;
        let y_precision = parcel::read_f32(buf, "y precision")?;
        let raw_x_cursor_position = parcel::read_f32(buf, "cursor x")?;
        let raw_y_cursor_position = parcel::read_f32(buf, "cursor y")?;
        let raw_transform = Transform::read_from_parcel(buf)?;
        let down_time = parcel::read_i64(buf, "down time")?;
        let pointer_count = parcel::read_u32(buf, "pointer count")?;
        if pointer_count == 0 || pointer_count as usize > MAX_POINTERS {
            return Err(EvhubError::MalformedParcel(format!(
                "bad pointer count {pointer_count}"
            )));
        }
        let sample_count = parcel::read_u32(buf, "sample count")?;
        if sample_count == 0 || sample_count > MAX_PARCEL_SAMPLES {
            return Err(EvhubError::MalformedParcel(format!(
                "bad sample count {sample_count}"
            )));
        }
        let mut pointer_properties = Vec::with_capacity(pointer_count as usize);
        for _ in 0..pointer_count {
            pointer_properties.push(PointerProperties::read_from_parcel(buf)?);
        }
        let mut sample_event_times = Vec::with_capacity(sample_count as usize);
        let mut sample_coords = Vec::with_capacity((sample_count * pointer_count) as usize);
        for _ in 0..sample_count {
            sample_event_times.push(parcel::read_i64(buf, "sample time")?);
            for _ in 0..pointer_count {
                sample_coords.push(PointerCoords::read_from_parcel(buf)?);
            }
        }
        Ok(Self {
            id,
            device_id,
            source,
            display_id,
            signature,
            action,
            action_button,
            flags,
            edge_flags,
            meta_state,
            button_state,
            classification,
            transform,
            x_precision,
            y_precision,
            raw_x_cursor_position,
            raw_y_cursor_position,
            raw_transform,
            down_time,
            pointer_properties,
            sample_event_times,
            sample_coords,
        })
    }
}
