//! Device Hub
//!
//! Multiplexed acquisition of raw evdev events. One epoll instance watches
//! every open device node, an inotify watch on the device directory drives
//! hot-plug, and an eventfd provides a bounded-wait wake-up. Discovery and
//! removal surface as synthetic events interleaved into the hardware stream:
//! a device's `DEVICE_ADDED` always precedes its first hardware event, and
//! `DEVICE_REMOVED` follows its last.
//!
//! The hub is a single-reader object; [`DeviceHub::get_events`] takes
//! `&mut self`. [`DeviceHub::wake`] is safe to call from another thread
//! through a shared reference.

use crate::config::DeviceHubConfig;
use crate::error::Result;
use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use nix::time::ClockId;
use nix::unistd;
use std::collections::VecDeque;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod registry;

use registry::{DeviceRegistry, InputDeviceIdentifier};

const WAKE_TOKEN: u64 = 0;
const INOTIFY_TOKEN: u64 = u64::MAX;

const INPUT_EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

/// One raw event from the hub: either a hardware evdev event or a synthetic
/// device-transition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Session-unique device id
    pub device_id: i32,
    /// Monotonic timestamp in nanoseconds
    pub when: i64,
    /// Hardware event type, or one of the synthetic types
    pub event_type: u32,
    /// Hardware event code; zero for synthetic events
    pub code: u16,
    /// Hardware event value; zero for synthetic events
    pub value: i32,
}

impl RawEvent {
    /// Values at or above this are synthetic, disjoint from the `u16`
    /// hardware type space
    pub const FIRST_SYNTHETIC_EVENT: u32 = 0x1000_0000;
    /// A device became available
    pub const DEVICE_ADDED: u32 = Self::FIRST_SYNTHETIC_EVENT;
    /// A device went away; its id is never seen again
    pub const DEVICE_REMOVED: u32 = Self::FIRST_SYNTHETIC_EVENT + 1;

    fn synthetic(device_id: i32, when: i64, event_type: u32) -> Self {
        Self {
            device_id,
            when,
            event_type,
            code: 0,
            value: 0,
        }
    }
}

/// Multiplexed evdev event source with hot-plug discovery
#[derive(Debug)]
pub struct DeviceHub {
    config: DeviceHubConfig,
    epoll: Epoll,
    inotify: Inotify,
    wake: EventFd,
    registry: DeviceRegistry,
    pending: VecDeque<RawEvent>,
}

impl DeviceHub {
    /// Create a hub over the configured device directory and enumerate the
    /// nodes already present; each yields one `DEVICE_ADDED` before any of
    /// its hardware events.
    pub fn new(config: DeviceHubConfig) -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)?;
        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)?;
        inotify.add_watch(
            &config.device_path,
            AddWatchFlags::IN_CREATE | AddWatchFlags::IN_DELETE,
        )?;
        let wake = EventFd::from_value_and_flags(0, EfdFlags::EFD_NONBLOCK | EfdFlags::EFD_CLOEXEC)?;
        epoll.add(&wake, EpollEvent::new(EpollFlags::EPOLLIN, WAKE_TOKEN))?;
        epoll.add(&inotify, EpollEvent::new(EpollFlags::EPOLLIN, INOTIFY_TOKEN))?;

        let mut hub = Self {
            config,
            epoll,
            inotify,
            wake,
            registry: DeviceRegistry::new(),
            pending: VecDeque::new(),
        };
        hub.scan_devices()?;
        info!(
            path = %hub.config.device_path.display(),
            devices = hub.registry.device_ids().len(),
            "device hub ready"
        );
        Ok(hub)
    }

    /// Wait for events up to `timeout`; `None` waits indefinitely,
    /// `Some(Duration::ZERO)` polls. Returns an empty batch on timeout or
    /// when [`Self::wake`] was called.
    pub fn get_events(&mut self, timeout: Option<Duration>) -> Result<Vec<RawEvent>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut events = Vec::new();
        let mut awoken = false;
        loop {
            while events.len() < self.config.event_buffer_size {
                match self.pending.pop_front() {
                    Some(event) => events.push(event),
                    None => break,
                }
            }
            if !events.is_empty() || awoken {
                return Ok(events);
            }

            // EpollTimeout caps below the full Duration range; a short wait
            // just loops until the deadline.
            let epoll_timeout = match deadline {
                None => EpollTimeout::NONE,
                Some(deadline) => {
                    epoll_timeout_for(deadline.saturating_duration_since(Instant::now()))
                }
            };
            let mut ready = [EpollEvent::empty(); 32];
            let ready_count = match self.epoll.wait(&mut ready, epoll_timeout) {
                Ok(count) => count,
                Err(Errno::EINTR) => 0,
                Err(errno) => return Err(errno.into()),
            };
            if ready_count == 0 {
                match deadline {
                    Some(deadline) if Instant::now() >= deadline => return Ok(events),
                    _ => continue,
                }
            }
            for ready_event in &ready[..ready_count] {
                match ready_event.data() {
                    WAKE_TOKEN => {
                        self.drain_wake();
                        awoken = true;
                    }
                    INOTIFY_TOKEN => self.handle_inotify()?,
                    token => self.read_device(token as i32, ready_event.events(), &mut events)?,
                }
            }
        }
    }

    /// Unblock a concurrent [`Self::get_events`] call
    pub fn wake(&self) -> Result<()> {
        self.wake.arm()?;
        Ok(())
    }

    /// Ids of the currently open devices, in ascending order
    pub fn device_ids(&self) -> Vec<i32> {
        self.registry.device_ids()
    }

    /// Last-known identifier for `id`, surviving device removal
    pub fn device_identifier(&self, id: i32) -> Option<&InputDeviceIdentifier> {
        self.registry.identifier(id)
    }

    /// Whether the device reports the given key code
    pub fn supports_key(&self, id: i32, code: usize) -> bool {
        self.registry
            .device(id)
            .is_some_and(|device| device.key_bitmask.test(code))
    }

    /// Whether the device reports any absolute axis in `[start, end)`
    pub fn supports_abs_range(&self, id: i32, start: usize, end: usize) -> bool {
        self.registry
            .device(id)
            .is_some_and(|device| device.abs_bitmask.any(start, end))
    }

    /// Whether the device reports the given relative axis
    pub fn supports_rel(&self, id: i32, code: usize) -> bool {
        self.registry
            .device(id)
            .is_some_and(|device| device.rel_bitmask.test(code))
    }

    fn scan_devices(&mut self) -> Result<()> {
        let mut paths: Vec<_> = std::fs::read_dir(&self.config.device_path)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_type().map(|t| t.is_dir()).unwrap_or(true))
            .map(|entry| entry.path())
            .collect();
        paths.sort();
        for path in paths {
            if let Err(error) = self.open_device(&path) {
                warn!(path = %path.display(), %error, "skipping device node");
            }
        }
        Ok(())
    }

    fn open_device(&mut self, path: &Path) -> Result<()> {
        if self.registry.id_by_path(path).is_some() {
            return Ok(());
        }
        let id = self.registry.open_device(path)?;
        if let Some(device) = self.registry.device(id) {
            self.epoll
                .add(&device.file, EpollEvent::new(EpollFlags::EPOLLIN, id as u64))?;
        }
        self.pending
            .push_back(RawEvent::synthetic(id, monotonic_now()?, RawEvent::DEVICE_ADDED));
        Ok(())
    }

    fn close_device(&mut self, id: i32) -> Result<()> {
        if let Some(device) = self.registry.close_device(id) {
            // The kernel drops dead fds from the epoll set on its own.
            let _ = self.epoll.delete(&device.file);
            self.pending
                .push_back(RawEvent::synthetic(id, monotonic_now()?, RawEvent::DEVICE_REMOVED));
        }
        Ok(())
    }

    fn handle_inotify(&mut self) -> Result<()> {
        let inotify_events = match self.inotify.read_events() {
            Ok(inotify_events) => inotify_events,
            Err(Errno::EAGAIN) => return Ok(()),
            Err(errno) => return Err(errno.into()),
        };
        for inotify_event in inotify_events {
            let Some(name) = inotify_event.name else {
                continue;
            };
            let path = self.config.device_path.join(name);
            if inotify_event.mask.contains(AddWatchFlags::IN_CREATE) {
                if let Err(error) = self.open_device(&path) {
                    warn!(path = %path.display(), %error, "skipping created device node");
                }
            } else if inotify_event.mask.contains(AddWatchFlags::IN_DELETE) {
                if let Some(id) = self.registry.id_by_path(&path) {
                    self.close_device(id)?;
                }
            }
        }
        Ok(())
    }

    fn read_device(&mut self, id: i32, flags: EpollFlags, events: &mut Vec<RawEvent>) -> Result<()> {
        let Some(device) = self.registry.device(id) else {
            // Already closed earlier in this batch.
            return Ok(());
        };
        if flags.intersects(EpollFlags::EPOLLHUP | EpollFlags::EPOLLERR) {
            debug!(id, "device hangup, treating as disconnect");
            return self.close_device(id);
        }
        let fd = device.file.as_raw_fd();

        let capacity = self
            .config
            .event_buffer_size
            .saturating_sub(events.len())
            .max(1);
        let mut buf = vec![0u8; capacity * INPUT_EVENT_SIZE];
        match unistd::read(fd, &mut buf) {
            Ok(0) => {
                debug!(id, "end of file, treating as disconnect");
                self.close_device(id)?;
            }
            Ok(read) => {
                let now = monotonic_now()?;
                let slack = self.config.timestamp_slack.as_nanos().min(i64::MAX as u128) as i64;
                for chunk in buf[..read - read % INPUT_EVENT_SIZE].chunks_exact(INPUT_EVENT_SIZE) {
                    let raw: libc::input_event =
                        unsafe { std::ptr::read_unaligned(chunk.as_ptr().cast()) };
                    let when = raw.time.tv_sec * 1_000_000_000 + raw.time.tv_usec * 1_000;
                    events.push(RawEvent {
                        device_id: id,
                        when: sanitize_timestamp(when, now, slack),
                        event_type: raw.type_ as u32,
                        code: raw.code,
                        value: raw.value,
                    });
                }
            }
            Err(errno) if is_transient_read_errno(errno) => {}
            Err(errno) => {
                warn!(id, %errno, "device read failed, treating as disconnect");
                self.close_device(id)?;
            }
        }
        Ok(())
    }

    fn drain_wake(&self) {
        let mut buf = [0u8; 8];
        let _ = unistd::read(self.wake.as_raw_fd(), &mut buf);
    }
}

// A signal interrupt or a drained fd is not a disconnect; only real read
// failures tear the device down.
fn is_transient_read_errno(errno: Errno) -> bool {
    matches!(errno, Errno::EAGAIN | Errno::EINTR)
}

// Truncating to whole milliseconds would turn the tail of a timeout into a
// zero-timeout spin; round sub-millisecond remainders up to one tick.
fn epoll_timeout_for(remaining: Duration) -> EpollTimeout {
    let millis = remaining.as_millis().min(u16::MAX as u128) as u16;
    if millis == 0 && !remaining.is_zero() {
        EpollTimeout::from(1u16)
    } else {
        EpollTimeout::from(millis)
    }
}

// A timestamp from the future or from before the slack window points at a
// misbehaving driver clock; pin it to the read time instead.
fn sanitize_timestamp(when: i64, now: i64, slack: i64) -> i64 {
    if when > now || when < now.saturating_sub(slack) {
        now
    } else {
        when
    }
}

fn monotonic_now() -> Result<i64> {
    let ts = nix::time::clock_gettime(ClockId::CLOCK_MONOTONIC)?;
    Ok(ts.tv_sec() * 1_000_000_000 + ts.tv_nsec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn hub_over(dir: &Path) -> DeviceHub {
        let config = DeviceHubConfig {
            device_path: dir.to_path_buf(),
            ..DeviceHubConfig::default()
        };
        DeviceHub::new(config).unwrap()
    }

    #[test]
    fn test_sanitize_timestamp() {
        let now = 10_000_000_000;
        let slack = 2_000_000_000;
        assert_eq!(sanitize_timestamp(now, now, slack), now);
        assert_eq!(sanitize_timestamp(now - 1, now, slack), now - 1);
        assert_eq!(sanitize_timestamp(now - slack, now, slack), now - slack);
        // Future stamps and stamps older than the slack window are pinned.
        assert_eq!(sanitize_timestamp(now + 1, now, slack), now);
        assert_eq!(sanitize_timestamp(now - slack - 1, now, slack), now);
        assert_eq!(sanitize_timestamp(0, now, slack), now);
    }

    #[test]
    fn test_transient_read_errnos_do_not_disconnect() {
        assert!(is_transient_read_errno(Errno::EAGAIN));
        assert!(is_transient_read_errno(Errno::EINTR));
        assert!(!is_transient_read_errno(Errno::ENODEV));
        assert!(!is_transient_read_errno(Errno::EIO));
    }

    #[test]
    fn test_epoll_timeout_rounds_sub_millisecond_remainders_up() {
        assert_eq!(epoll_timeout_for(Duration::ZERO), EpollTimeout::ZERO);
        assert_eq!(
            epoll_timeout_for(Duration::from_micros(200)),
            EpollTimeout::from(1u16)
        );
        assert_eq!(
            epoll_timeout_for(Duration::from_millis(5)),
            EpollTimeout::from(5u16)
        );
        assert_eq!(
            epoll_timeout_for(Duration::from_secs(120)),
            EpollTimeout::from(u16::MAX)
        );
    }

    #[test]
    fn test_idle_hub_polls_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = hub_over(dir.path());
        assert!(hub.device_ids().is_empty());
        assert!(hub.get_events(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn test_scan_skips_non_device_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("event0"), b"not a device").unwrap();
        fs::create_dir(dir.path().join("by-id")).unwrap();

        let mut hub = hub_over(dir.path());
        assert!(hub.device_ids().is_empty());
        assert!(hub.get_events(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn test_created_junk_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = hub_over(dir.path());

        fs::write(dir.path().join("event0"), b"junk").unwrap();
        assert!(hub
            .get_events(Some(Duration::from_millis(200)))
            .unwrap()
            .is_empty());
        assert!(hub.device_ids().is_empty());
    }

    #[test]
    fn test_wake_unblocks_wait() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = hub_over(dir.path());

        hub.wake().unwrap();
        let start = Instant::now();
        let events = hub.get_events(Some(Duration::from_secs(10))).unwrap();
        assert!(events.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_capability_queries_on_unknown_device() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub_over(dir.path());
        assert!(!hub.supports_key(1, 30));
        assert!(!hub.supports_abs_range(1, 0, 64));
        assert!(!hub.supports_rel(1, 0));
        assert!(hub.device_identifier(1).is_none());
    }
}
