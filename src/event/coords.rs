//! Sparse Pointer Samples
//!
//! [`PointerCoords`] stores one pointer's axis values as a presence bitmask
//! plus a parallel value array kept in ascending axis-id order. The bitmask
//! is MSB-first: axis 0 occupies the top bit, so the value index of an axis
//! is the popcount of the bits above it.

use crate::error::{EvhubError, Result};
use crate::event::{axis, parcel, ToolType};
use bytes::BufMut;

/// Sparse axis-value container for one pointer's sample
#[derive(Debug, Clone, Copy)]
pub struct PointerCoords {
    /// Axis presence bitmask, axis 0 at the most significant bit
    pub bits: u64,
    values: [f32; Self::MAX_AXES],
    /// Whether this sample's coordinates were synthetically interpolated
    pub is_resampled: bool,
}

impl Default for PointerCoords {
    fn default() -> Self {
        Self {
            bits: 0,
            values: [0.0; Self::MAX_AXES],
            is_resampled: false,
        }
    }
}

impl PartialEq for PointerCoords {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
            && self.values() == other.values()
            && self.is_resampled == other.is_resampled
    }
}

impl PointerCoords {
    /// Hard capacity ceiling on simultaneously present axes
    pub const MAX_AXES: usize = 30;

    // Axis ids address bit positions in a u64, MSB-first.
    const MAX_AXIS_ID: u32 = 63;

    /// New empty sample
    pub fn new() -> Self {
        Self::default()
    }

    fn bit_for(axis: u32) -> u64 {
        1u64 << (63 - axis)
    }

    fn index_for(&self, axis: u32) -> usize {
        // Bits above the axis's bit are exactly the smaller axis ids.
        (self.bits & !(u64::MAX >> axis)).count_ones() as usize
    }

    /// Reset to an empty, non-resampled sample
    pub fn clear(&mut self) {
        self.bits = 0;
        self.values = [0.0; Self::MAX_AXES];
        self.is_resampled = false;
    }

    /// Number of present axes
    pub fn axis_count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// The present axis values in ascending axis-id order
    pub fn values(&self) -> &[f32] {
        &self.values[..self.axis_count()]
    }

    /// Value of an axis, or 0.0 when the axis is absent or out of range
    pub fn axis_value(&self, axis: u32) -> f32 {
        if axis > Self::MAX_AXIS_ID || self.bits & Self::bit_for(axis) == 0 {
            return 0.0;
        }
        self.values[self.index_for(axis)]
    }

    /// Insert or overwrite an axis value.
    ///
    /// Overwriting an existing axis never reorders; inserting a new axis
    /// shifts later values up. Fails without mutating when the axis is new
    /// and [`Self::MAX_AXES`] values are already present, or when the axis
    /// id is outside the addressable range.
    pub fn set_axis_value(&mut self, axis: u32, value: f32) -> Result<()> {
        if axis > Self::MAX_AXIS_ID {
            return Err(EvhubError::InvalidAxis(axis));
        }
        let bit = Self::bit_for(axis);
        let index = self.index_for(axis);
        if self.bits & bit == 0 {
            let count = self.axis_count();
            if count >= Self::MAX_AXES {
                return Err(EvhubError::PointerCoordsFull(axis));
            }
            self.values.copy_within(index..count, index + 1);
            self.bits |= bit;
        }
        self.values[index] = value;
        Ok(())
    }

    /// Convenience accessor for [`axis::X`]
    pub fn x(&self) -> f32 {
        self.axis_value(axis::X)
    }

    /// Convenience accessor for [`axis::Y`]
    pub fn y(&self) -> f32 {
        self.axis_value(axis::Y)
    }

    /// The (x, y) pair as a tuple
    pub fn xy(&self) -> (f32, f32) {
        (self.x(), self.y())
    }

    /// Scale position-like axes by `window_x`/`window_y` and contact-geometry
    /// axes by `global`. Pressure, size, and orientation are unitless and
    /// stay untouched.
    pub fn scale(&mut self, global: f32, window_x: f32, window_y: f32) {
        self.scale_axis(axis::X, window_x);
        self.scale_axis(axis::Y, window_y);
        self.scale_axis(axis::TOUCH_MAJOR, global);
        self.scale_axis(axis::TOUCH_MINOR, global);
        self.scale_axis(axis::TOOL_MAJOR, global);
        self.scale_axis(axis::TOOL_MINOR, global);
        self.scale_axis(axis::RELATIVE_X, window_x);
        self.scale_axis(axis::RELATIVE_Y, window_y);
    }

    fn scale_axis(&mut self, axis: u32, factor: f32) {
        if self.bits & Self::bit_for(axis) != 0 {
            let index = self.index_for(axis);
            self.values[index] *= factor;
        }
    }

    /// Serialize to a byte channel
    pub fn write_to_parcel(&self, out: &mut impl BufMut) {
        out.put_u64(self.bits);
        for value in self.values() {
            out.put_f32(*value);
        }
        out.put_u8(self.is_resampled as u8);
    }

    /// Deserialize from a byte channel, reproducing bitmask, values, and the
    /// resampled flag exactly
    pub fn read_from_parcel(buf: &mut impl bytes::Buf) -> Result<Self> {
        let bits = parcel::read_u64(buf, "coords bits")?;
        let count = bits.count_ones() as usize;
        if count > Self::MAX_AXES {
            return Err(EvhubError::MalformedParcel(format!(
                "coords bitmask has {count} axes, max {}",
                Self::MAX_AXES
            )));
        }
        let mut values = [0.0f32; Self::MAX_AXES];
        for value in values.iter_mut().take(count) {
            *value = parcel::read_f32(buf, "coords value")?;
        }
        let is_resampled = parcel::read_bool(buf, "coords resampled flag")?;
        Ok(Self {
            bits,
            values,
            is_resampled,
        })
    }
}

/// Per-pointer identity, stable across a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerProperties {
    /// Pointer id, stable for the lifetime of the gesture
    pub id: i32,
    /// Tool that produced the pointer
    pub tool_type: ToolType,
}

impl PointerProperties {
    /// New properties for a pointer id and tool
    pub fn new(id: i32, tool_type: ToolType) -> Self {
        Self { id, tool_type }
    }

    /// Reset to the default (id 0, unknown tool)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn write_to_parcel(&self, out: &mut impl BufMut) {
        out.put_i32(self.id);
        out.put_u8(self.tool_type as u8);
    }

    pub(crate) fn read_from_parcel(buf: &mut impl bytes::Buf) -> Result<Self> {
        let id = parcel::read_i32(buf, "pointer id")?;
        let raw_tool = parcel::read_u8(buf, "tool type")?;
        let tool_type = ToolType::from_u8(raw_tool)
            .ok_or_else(|| EvhubError::MalformedParcel(format!("bad tool type {raw_tool}")))?;
        Ok(Self { id, tool_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_clear_sets_bits_to_zero() {
        let mut coords = PointerCoords::new();
        coords.set_axis_value(3, 1.0).unwrap();
        coords.is_resampled = true;
        coords.clear();
        assert_eq!(coords.bits, 0);
        assert!(!coords.is_resampled);
    }

    #[test]
    fn test_axis_values_keep_ascending_order() {
        let mut coords = PointerCoords::new();

        assert_eq!(coords.axis_value(0), 0.0);
        assert_eq!(coords.axis_value(1), 0.0);

        // First axis.
        coords.set_axis_value(1, 5.0).unwrap();
        assert_eq!(coords.values(), &[5.0]);
        assert_eq!(coords.bits, 0x4000_0000_0000_0000);
        assert_eq!(coords.axis_value(0), 0.0);
        assert_eq!(coords.axis_value(1), 5.0);

        // Higher id than all others: appended at the end.
        coords.set_axis_value(3, 2.0).unwrap();
        assert_eq!(coords.bits, 0x5000_0000_0000_0000);
        assert_eq!(coords.values(), &[5.0, 2.0]);
        assert_eq!(coords.axis_value(2), 0.0);
        assert_eq!(coords.axis_value(3), 2.0);

        // Lower id than all others: prepended at the beginning.
        coords.set_axis_value(0, 4.0).unwrap();
        assert_eq!(coords.bits, 0xd000_0000_0000_0000);
        assert_eq!(coords.values(), &[4.0, 5.0, 2.0]);
        assert_eq!(coords.axis_value(0), 4.0);
        assert_eq!(coords.axis_value(1), 5.0);

        // Id between the others: inserted in the middle.
        coords.set_axis_value(2, 1.0).unwrap();
        assert_eq!(coords.bits, 0xf000_0000_0000_0000);
        assert_eq!(coords.values(), &[4.0, 5.0, 1.0, 2.0]);

        // Existing axis overwritten in place.
        coords.set_axis_value(1, 6.0).unwrap();
        assert_eq!(coords.bits, 0xf000_0000_0000_0000);
        assert_eq!(coords.values(), &[4.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn test_capacity_failure_leaves_state_unchanged() {
        let mut coords = PointerCoords::new();
        for axis in 0..PointerCoords::MAX_AXES as u32 {
            coords.set_axis_value(axis, axis as f32).unwrap();
        }
        assert_eq!(coords.axis_count(), PointerCoords::MAX_AXES);

        let before_bits = coords.bits;
        let before_values: Vec<f32> = coords.values().to_vec();
        let err = coords
            .set_axis_value(PointerCoords::MAX_AXES as u32, 100.0)
            .unwrap_err();
        assert!(matches!(err, EvhubError::PointerCoordsFull(_)));
        assert_eq!(coords.bits, before_bits);
        assert_eq!(coords.values(), before_values.as_slice());
    }

    #[test]
    fn test_out_of_range_axis() {
        let mut coords = PointerCoords::new();
        assert!(matches!(
            coords.set_axis_value(64, 1.0),
            Err(EvhubError::InvalidAxis(64))
        ));
        assert_eq!(coords.axis_value(64), 0.0);
        assert_eq!(coords.bits, 0);
    }

    #[test]
    fn test_parcel_round_trip_empty() {
        let coords = PointerCoords::new();
        let mut parcel = BytesMut::new();
        coords.write_to_parcel(&mut parcel);

        let out = PointerCoords::read_from_parcel(&mut parcel.freeze()).unwrap();
        assert_eq!(out.bits, 0);
        assert!(!out.is_resampled);
    }

    #[test]
    fn test_parcel_round_trip() {
        let mut coords = PointerCoords::new();
        coords.set_axis_value(2, 5.0).unwrap();
        coords.set_axis_value(5, 8.0).unwrap();
        coords.is_resampled = true;

        let mut parcel = BytesMut::new();
        coords.write_to_parcel(&mut parcel);

        let out = PointerCoords::read_from_parcel(&mut parcel.freeze()).unwrap();
        assert_eq!(out, coords);
        assert_eq!(out.values(), &[5.0, 8.0]);
        assert!(out.is_resampled);
    }

    #[test]
    fn test_truncated_parcel_is_an_error() {
        let mut coords = PointerCoords::new();
        coords.set_axis_value(0, 1.5).unwrap();
        let mut parcel = BytesMut::new();
        coords.write_to_parcel(&mut parcel);
        let bytes = parcel.freeze();

        let mut truncated = &bytes[..bytes.len() - 2];
        assert!(PointerCoords::read_from_parcel(&mut truncated).is_err());
    }

    #[test]
    fn test_scale() {
        let mut coords = PointerCoords::new();
        coords.set_axis_value(axis::X, 10.0).unwrap();
        coords.set_axis_value(axis::Y, 20.0).unwrap();
        coords.set_axis_value(axis::PRESSURE, 0.5).unwrap();
        coords.set_axis_value(axis::TOUCH_MAJOR, 4.0).unwrap();
        coords.scale(2.0, 3.0, 4.0);
        assert_eq!(coords.axis_value(axis::X), 30.0);
        assert_eq!(coords.axis_value(axis::Y), 80.0);
        assert_eq!(coords.axis_value(axis::PRESSURE), 0.5);
        assert_eq!(coords.axis_value(axis::TOUCH_MAJOR), 8.0);
    }
}
