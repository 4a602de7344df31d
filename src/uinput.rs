//! Virtual Device Injection
//!
//! A minimal uinput-backed virtual keyboard for tests and simulation. The
//! hub has no knowledge of this module; it observes the device's node
//! appearing and disappearing exactly like real hardware.

use crate::error::{EvhubError, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use tracing::debug;

/// Synchronization event type
pub const EV_SYN: u16 = 0x00;
/// Key event type
pub const EV_KEY: u16 = 0x01;
/// Report-boundary synchronization code
pub const SYN_REPORT: u16 = 0;
/// Key code for the A key
pub const KEY_A: u16 = 30;
/// Key code for the Home key
pub const KEY_HOME: u16 = 102;

/// Bus type reported for virtual devices
pub const VIRTUAL_BUS: u16 = 0x03;
/// Vendor id reported for virtual devices
pub const VIRTUAL_VENDOR: u16 = 0x1234;
/// Product id reported for virtual devices
pub const VIRTUAL_PRODUCT: u16 = 0x5678;

nix::ioctl_none!(ui_dev_create, b'U', 1);
nix::ioctl_none!(ui_dev_destroy, b'U', 2);
nix::ioctl_write_int!(ui_set_evbit, b'U', 100);
nix::ioctl_write_int!(ui_set_keybit, b'U', 101);

/// Virtual keyboard whose node lives until the value is dropped
#[derive(Debug)]
pub struct VirtualKeyboard {
    file: File,
}

impl VirtualKeyboard {
    /// Create a virtual keyboard named `name` that declares the given key
    /// codes. Fails when `/dev/uinput` is absent or inaccessible.
    pub fn new(name: &str, keys: &[u16]) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/uinput")
            .map_err(|source| EvhubError::Uinput(format!("open /dev/uinput: {source}")))?;
        let fd = file.as_raw_fd();

        unsafe {
            ui_set_evbit(fd, EV_KEY as libc::c_ulong)?;
            ui_set_evbit(fd, EV_SYN as libc::c_ulong)?;
            for key in keys {
                ui_set_keybit(fd, *key as libc::c_ulong)?;
            }
        }

        let mut setup: libc::uinput_user_dev = unsafe { std::mem::zeroed() };
        for (dst, src) in setup.name.iter_mut().zip(name.bytes().take(79)) {
            *dst = src as libc::c_char;
        }
        setup.id.bustype = VIRTUAL_BUS;
        setup.id.vendor = VIRTUAL_VENDOR;
        setup.id.product = VIRTUAL_PRODUCT;
        setup.id.version = 1;
        file.write_all(struct_bytes(&setup))?;

        unsafe { ui_dev_create(fd) }?;
        debug!(name, "created virtual keyboard");
        Ok(Self { file })
    }

    /// Synthesize a full press-release cycle for `key`
    pub fn press_and_release(&mut self, key: u16) -> Result<()> {
        self.emit(EV_KEY, key, 1)?;
        self.emit(EV_SYN, SYN_REPORT, 0)?;
        self.emit(EV_KEY, key, 0)?;
        self.emit(EV_SYN, SYN_REPORT, 0)?;
        Ok(())
    }

    fn emit(&mut self, event_type: u16, code: u16, value: i32) -> Result<()> {
        let mut event: libc::input_event = unsafe { std::mem::zeroed() };
        event.type_ = event_type;
        event.code = code;
        event.value = value;
        self.file.write_all(struct_bytes(&event))?;
        Ok(())
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        let _ = unsafe { ui_dev_destroy(self.file.as_raw_fd()) };
    }
}

fn struct_bytes<T>(value: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts((value as *const T).cast(), std::mem::size_of::<T>()) }
}
