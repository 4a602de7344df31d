//! Input Event Model
//!
//! Richly-typed key and motion events with per-pointer sample history and a
//! raw-vs-window coordinate transform pipeline. Events are plain value types
//! with no internal synchronization; concurrent use requires external
//! exclusion or copying.
//!
//! # Architecture
//!
//! ```text
//! DeviceHub raw events
//!       ↓
//! (external event builder)
//!       ↓
//! ┌───────────────┐   ┌───────────────┐
//! │ PointerCoords │──▶│  MotionEvent  │──▶ transformed getters
//! └───────────────┘   │   KeyEvent    │        ↓
//!                     └───────────────┘   ┌───────────┐
//!                                         │ Transform │ raw vs window space
//!                                         └───────────┘
//! ```

use enumflags2::bitflags;
use std::sync::atomic::{AtomicI32, Ordering};

pub mod builders;
pub mod coords;
pub mod key;
pub mod motion;
pub mod parcel;
pub mod split;
pub mod transform;

/// Motion axis identifiers, matching the sparse [`coords::PointerCoords`]
/// bit positions.
pub mod axis {
    /// Absolute or windowed X position
    pub const X: u32 = 0;
    /// Absolute or windowed Y position
    pub const Y: u32 = 1;
    /// Normalized contact pressure
    pub const PRESSURE: u32 = 2;
    /// Normalized contact size
    pub const SIZE: u32 = 3;
    /// Major axis of the touch ellipse
    pub const TOUCH_MAJOR: u32 = 4;
    /// Minor axis of the touch ellipse
    pub const TOUCH_MINOR: u32 = 5;
    /// Major axis of the tool ellipse
    pub const TOOL_MAJOR: u32 = 6;
    /// Minor axis of the tool ellipse
    pub const TOOL_MINOR: u32 = 7;
    /// Clockwise tool angle from vertical, in radians
    pub const ORIENTATION: u32 = 8;
    /// Relative X motion since the previous sample
    pub const RELATIVE_X: u32 = 27;
    /// Relative Y motion since the previous sample
    pub const RELATIVE_Y: u32 = 28;
}

/// Meta-key state bits carried on key and motion events.
pub mod meta {
    /// No meta keys pressed
    pub const NONE: u32 = 0;
    /// An ALT key is pressed
    pub const ALT_ON: u32 = 0x02;
    /// A SHIFT key is pressed
    pub const SHIFT_ON: u32 = 0x01;
    /// A CTRL key is pressed
    pub const CTRL_ON: u32 = 0x1000;
}

/// Source class and concrete source bits.
///
/// The low byte holds the class bits; concrete sources combine a class with
/// a distinguishing high bit. The class determines how the transform
/// pipeline treats the source's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Source(pub u32);

impl Source {
    /// No class bits
    pub const CLASS_NONE: Source = Source(0x0000_0000);
    /// Button or key source class
    pub const CLASS_BUTTON: Source = Source(0x0000_0001);
    /// Absolute-position pointer class (mapped to a display)
    pub const CLASS_POINTER: Source = Source(0x0000_0002);
    /// Directionless relative navigation class
    pub const CLASS_NAVIGATION: Source = Source(0x0000_0004);
    /// Indirect absolute-position class (not mapped to a display)
    pub const CLASS_POSITION: Source = Source(0x0000_0008);
    /// Joystick class
    pub const CLASS_JOYSTICK: Source = Source(0x0000_0010);

    /// Unknown source
    pub const UNKNOWN: Source = Source(0x0000_0000);
    /// Keyboard
    pub const KEYBOARD: Source = Source(0x0000_0100 | Self::CLASS_BUTTON.0);
    /// Directional pad
    pub const DPAD: Source = Source(0x0000_0200 | Self::CLASS_BUTTON.0);
    /// Gamepad buttons
    pub const GAMEPAD: Source = Source(0x0000_0400 | Self::CLASS_BUTTON.0);
    /// Touchscreen
    pub const TOUCHSCREEN: Source = Source(0x0000_1000 | Self::CLASS_POINTER.0);
    /// Mouse in absolute pointer mode
    pub const MOUSE: Source = Source(0x0000_2000 | Self::CLASS_POINTER.0);
    /// Stylus
    pub const STYLUS: Source = Source(0x0000_4000 | Self::CLASS_POINTER.0);
    /// Trackball
    pub const TRACKBALL: Source = Source(0x0001_0000 | Self::CLASS_NAVIGATION.0);
    /// Mouse in relative mode
    pub const MOUSE_RELATIVE: Source = Source(0x0002_0000 | Self::CLASS_NAVIGATION.0);
    /// Touchpad in indirect position mode
    pub const TOUCHPAD: Source = Source(0x0010_0000 | Self::CLASS_POSITION.0);
    /// Touch navigation surface
    pub const TOUCH_NAVIGATION: Source = Source(0x0020_0000 | Self::CLASS_NONE.0);
    /// Joystick axes
    pub const JOYSTICK: Source = Source(0x0100_0000 | Self::CLASS_JOYSTICK.0);

    /// True when every bit of `other` is present in `self`
    pub fn is_from(self, other: Source) -> bool {
        self.0 & other.0 == other.0
    }

    /// Joystick, touchpad, and relative-mouse coordinates bypass the
    /// transform pipeline entirely.
    pub(crate) fn disregards_transform(self) -> bool {
        self.is_from(Self::CLASS_JOYSTICK)
            || self.is_from(Self::CLASS_POSITION)
            || self.is_from(Self::MOUSE_RELATIVE)
    }

    /// Only pointer-class sources are anchored to the display, so only they
    /// receive the translation component of a transform.
    pub(crate) fn disregards_offset(self) -> bool {
        !self.is_from(Self::CLASS_POINTER)
    }
}

/// Logical display identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub i32);

impl DisplayId {
    /// The default display
    pub const DEFAULT: DisplayId = DisplayId(0);
    /// No associated display
    pub const INVALID: DisplayId = DisplayId(-1);
}

/// Tool that produced a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ToolType {
    /// Unknown tool
    #[default]
    Unknown = 0,
    /// Finger
    Finger = 1,
    /// Stylus tip
    Stylus = 2,
    /// Mouse
    Mouse = 3,
    /// Stylus eraser end
    Eraser = 4,
    /// Palm contact
    Palm = 5,
}

impl ToolType {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Finger),
            2 => Some(Self::Stylus),
            3 => Some(Self::Mouse),
            4 => Some(Self::Eraser),
            5 => Some(Self::Palm),
            _ => None,
        }
    }
}

/// Gesture classification attached by an external classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MotionClassification {
    /// No classification
    #[default]
    None = 0,
    /// Gesture is ambiguous and may be reclassified
    AmbiguousGesture = 1,
    /// Deep press
    DeepPress = 2,
}

impl MotionClassification {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::AmbiguousGesture),
            2 => Some(Self::DeepPress),
            _ => None,
        }
    }
}

/// Motion event flags
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionFlag {
    /// The receiving window is obscured by another visible window
    WindowIsObscured = 0x0000_0001,
    /// The receiving window is partially obscured
    WindowIsPartiallyObscured = 0x0000_0002,
    /// The event (or the pointer leaving in a split) was canceled
    Canceled = 0x0000_0020,
    /// The tool reports a meaningful orientation axis
    SupportsOrientation = 0x0080_0000,
    /// Orientation distinguishes a full 2π direction rather than a π-symmetric axis
    SupportsDirectionalOrientation = 0x0100_0000,
}

/// Key event flags
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFlag {
    /// The event was generated by the system from a trusted source
    FromSystem = 0x0000_0008,
    /// The key repeat was generated in software
    SoftKeyboard = 0x0000_0002,
    /// The event was canceled
    Canceled = 0x0000_0020,
}

/// Key event action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyAction {
    /// Key pressed
    Down = 0,
    /// Key released
    Up = 1,
}

impl KeyAction {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            _ => None,
        }
    }
}

/// Motion event action, with the acting pointer index for multi-pointer
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAction {
    /// First pointer went down
    Down,
    /// Last pointer went up
    Up,
    /// One or more pointers moved
    Move,
    /// The gesture was canceled
    Cancel,
    /// A press occurred outside the receiving window
    Outside,
    /// An additional pointer went down
    PointerDown {
        /// Index of the pointer that went down
        index: u8,
    },
    /// A non-final pointer went up
    PointerUp {
        /// Index of the pointer that went up
        index: u8,
    },
    /// Hover movement without contact
    HoverMove,
    /// Scroll wheel motion
    Scroll,
    /// Hover entered the window
    HoverEnter,
    /// Hover left the window
    HoverExit,
}

const ACTION_MASK: u32 = 0xff;
const ACTION_POINTER_INDEX_MASK: u32 = 0xff00;
const ACTION_POINTER_INDEX_SHIFT: u32 = 8;

impl MotionAction {
    /// Pack into the wire encoding (low byte action, byte 1 pointer index)
    pub fn to_code(self) -> u32 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Move => 2,
            Self::Cancel => 3,
            Self::Outside => 4,
            Self::PointerDown { index } => 5 | ((index as u32) << ACTION_POINTER_INDEX_SHIFT),
            Self::PointerUp { index } => 6 | ((index as u32) << ACTION_POINTER_INDEX_SHIFT),
            Self::HoverMove => 7,
            Self::Scroll => 8,
            Self::HoverEnter => 9,
            Self::HoverExit => 10,
        }
    }

    /// Unpack from the wire encoding
    pub fn from_code(code: u32) -> Option<Self> {
        let index = ((code & ACTION_POINTER_INDEX_MASK) >> ACTION_POINTER_INDEX_SHIFT) as u8;
        match code & ACTION_MASK {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::Move),
            3 => Some(Self::Cancel),
            4 => Some(Self::Outside),
            5 => Some(Self::PointerDown { index }),
            6 => Some(Self::PointerUp { index }),
            7 => Some(Self::HoverMove),
            8 => Some(Self::Scroll),
            9 => Some(Self::HoverEnter),
            10 => Some(Self::HoverExit),
            _ => None,
        }
    }
}

/// Opaque 32-byte event integrity tag. Computing and verifying tags is an
/// external collaborator's concern; events carry the bytes verbatim.
pub type Signature = [u8; 32];

/// The all-zero tag carried by unsigned events
pub const INVALID_SIGNATURE: Signature = [0; 32];

/// Highest pointer id usable in a split-pointer id set
pub const MAX_POINTER_ID: i32 = 31;

static NEXT_EVENT_ID: AtomicI32 = AtomicI32::new(1);

/// Process-wide monotonically increasing event id source.
///
/// Used for fresh events and for the id adopted by each added sample.
pub fn next_event_id() -> i32 {
    NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed)
}
