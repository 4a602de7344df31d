//! Device Registry
//!
//! Owns the open evdev device records: file handles, identity, capability
//! bitmasks, and the session-unique id allocation. Ids start at 1, grow
//! monotonically, and are never reused; identifiers of removed devices stay
//! queryable from a stale-ok cache.

use crate::bitarray::BitArray;
use crate::error::{EvhubError, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// Bit counts from the kernel's KEY_CNT / REL_CNT / ABS_CNT.
const KEY_WORDS: usize = 0x300 / 32;
const REL_WORDS: usize = 0x10 / 32 + 1;
const ABS_WORDS: usize = 0x40 / 32;

/// Key-code capability bitmask
pub type KeyBitmask = BitArray<KEY_WORDS>;
/// Relative-axis capability bitmask
pub type RelBitmask = BitArray<REL_WORDS>;
/// Absolute-axis capability bitmask
pub type AbsBitmask = BitArray<ABS_WORDS>;

nix::ioctl_read!(eviocgid, b'E', 0x02, libc::input_id);
nix::ioctl_read_buf!(eviocgname, b'E', 0x06, u8);
nix::ioctl_read_buf!(eviocgphys, b'E', 0x07, u8);
nix::ioctl_read_buf!(eviocguniq, b'E', 0x08, u8);
nix::ioctl_read_buf!(eviocgbit_key, b'E', 0x21, u8);
nix::ioctl_read_buf!(eviocgbit_rel, b'E', 0x22, u8);
nix::ioctl_read_buf!(eviocgbit_abs, b'E', 0x23, u8);
nix::ioctl_write_ptr!(eviocsclockid, b'E', 0xa0, libc::c_int);

/// Stable identity of an input device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputDeviceIdentifier {
    /// Device name as reported by the kernel
    pub name: String,
    /// Physical location (topology path)
    pub location: String,
    /// Unique id (serial), often empty
    pub unique_id: String,
    /// Bus type
    pub bus: u16,
    /// Vendor id
    pub vendor: u16,
    /// Product id
    pub product: u16,
    /// Version
    pub version: u16,
    /// Hex SHA-256 descriptor, unique among live devices
    pub descriptor: String,
}

/// One open evdev device
#[derive(Debug)]
pub(crate) struct Device {
    pub path: PathBuf,
    pub file: File,
    pub identifier: InputDeviceIdentifier,
    pub key_bitmask: KeyBitmask,
    pub rel_bitmask: RelBitmask,
    pub abs_bitmask: AbsBitmask,
}

/// Open-device table with explicit open/close lifecycle
#[derive(Debug, Default)]
pub(crate) struct DeviceRegistry {
    devices: BTreeMap<i32, Device>,
    by_path: HashMap<PathBuf, i32>,
    // Identifiers of removed devices, kept for late queries.
    removed_identifiers: HashMap<i32, InputDeviceIdentifier>,
    next_id: i32,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Open the device node at `path`, read its identity and capabilities,
    /// switch its event clock to the monotonic clock, and register it under
    /// a fresh id.
    pub fn open_device(&mut self, path: &Path) -> Result<i32> {
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| EvhubError::DeviceOpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let mut input_id = libc::input_id {
            bustype: 0,
            vendor: 0,
            product: 0,
            version: 0,
        };
        unsafe { eviocgid(fd, &mut input_id) }?;

        let mut identifier = InputDeviceIdentifier {
            name: read_string_ioctl(|buf| unsafe { eviocgname(fd, buf) }),
            location: read_string_ioctl(|buf| unsafe { eviocgphys(fd, buf) }),
            unique_id: read_string_ioctl(|buf| unsafe { eviocguniq(fd, buf) }),
            bus: input_id.bustype,
            vendor: input_id.vendor,
            product: input_id.product,
            version: input_id.version,
            descriptor: String::new(),
        };
        identifier.descriptor = self.unique_descriptor(&identifier);

        let key_bitmask = read_bitmask(|buf| unsafe { eviocgbit_key(fd, buf) });
        let rel_bitmask = read_bitmask(|buf| unsafe { eviocgbit_rel(fd, buf) });
        let abs_bitmask = read_bitmask(|buf| unsafe { eviocgbit_abs(fd, buf) });

        // Kernel timestamps in CLOCK_MONOTONIC, matching the hub's clock.
        let clock: libc::c_int = libc::CLOCK_MONOTONIC;
        if let Err(errno) = unsafe { eviocsclockid(fd, &clock) } {
            warn!(path = %path.display(), %errno, "EVIOCSCLOCKID failed, keeping realtime stamps");
        }

        let id = self.next_id;
        self.next_id += 1;
        debug!(
            id,
            path = %path.display(),
            name = %identifier.name,
            descriptor = %identifier.descriptor,
            "opened input device"
        );
        self.by_path.insert(path.to_path_buf(), id);
        self.devices.insert(
            id,
            Device {
                path: path.to_path_buf(),
                file,
                identifier,
                key_bitmask,
                rel_bitmask,
                abs_bitmask,
            },
        );
        Ok(id)
    }

    /// Remove a device by id, keeping its identifier queryable
    pub fn close_device(&mut self, id: i32) -> Option<Device> {
        let device = self.devices.remove(&id)?;
        self.by_path.remove(&device.path);
        self.removed_identifiers
            .insert(id, device.identifier.clone());
        debug!(id, path = %device.path.display(), "closed input device");
        Some(device)
    }

    pub fn device(&self, id: i32) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn id_by_path(&self, path: &Path) -> Option<i32> {
        self.by_path.get(path).copied()
    }

    pub fn device_ids(&self) -> Vec<i32> {
        self.devices.keys().copied().collect()
    }

    /// Last-known identifier for `id`, live or removed
    pub fn identifier(&self, id: i32) -> Option<&InputDeviceIdentifier> {
        self.devices
            .get(&id)
            .map(|device| &device.identifier)
            .or_else(|| self.removed_identifiers.get(&id))
    }

    // Twin devices (same vendor/product/name, no serial) hash identically;
    // fold a nonce into the hash until the result is unique among live
    // devices.
    fn unique_descriptor(&self, identifier: &InputDeviceIdentifier) -> String {
        let mut nonce = 0u32;
        loop {
            let descriptor = generate_descriptor(identifier, nonce);
            let taken = self
                .devices
                .values()
                .any(|device| device.identifier.descriptor == descriptor);
            if !taken {
                if nonce != 0 {
                    debug!(nonce, name = %identifier.name, "descriptor collision resolved");
                }
                return descriptor;
            }
            nonce += 1;
        }
    }
}

fn generate_descriptor(identifier: &InputDeviceIdentifier, nonce: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.bus.to_le_bytes());
    hasher.update(identifier.vendor.to_le_bytes());
    hasher.update(identifier.product.to_le_bytes());
    hasher.update(identifier.version.to_le_bytes());
    hasher.update(identifier.name.as_bytes());
    hasher.update([0]);
    hasher.update(identifier.location.as_bytes());
    hasher.update([0]);
    hasher.update(identifier.unique_id.as_bytes());
    if nonce != 0 {
        hasher.update(nonce.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// Devices without a phys/uniq string report an error; treat that as empty.
fn read_string_ioctl(call: impl FnOnce(&mut [u8]) -> nix::Result<libc::c_int>) -> String {
    let mut buf = [0u8; 256];
    if call(&mut buf).is_err() {
        return String::new();
    }
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn read_bitmask<const WORDS: usize>(
    call: impl FnOnce(&mut [u8]) -> nix::Result<libc::c_int>,
) -> BitArray<WORDS> {
    let mut buf = vec![0u8; WORDS * 4];
    let mut bits = BitArray::<WORDS>::new();
    if call(&mut buf).is_err() {
        return bits;
    }
    let mut words = [0u32; WORDS];
    for (word, chunk) in words.iter_mut().zip(buf.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    bits.load_from_buffer(words);
    bits
}
