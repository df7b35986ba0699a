use crate::error::KeyprobeError;
use crate::key_code::KeycodeTable;
use crate::keyboard::event_codes::{EV_KEY, EV_MSC, EV_REP, EV_SYN};
use crate::keyboard::EventDecoder;
use crate::KeyprobeResult;
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// The directory holding the event devices.
pub const INPUT_DIR: &str = "/dev/input";

const IOC_NRBITS: libc::c_ulong = 8;
const IOC_TYPEBITS: libc::c_ulong = 8;
const IOC_SIZEBITS: libc::c_ulong = 14;
const IOC_NRSHIFT: libc::c_ulong = 0;
const IOC_TYPESHIFT: libc::c_ulong = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: libc::c_ulong = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: libc::c_ulong = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_READ: libc::c_ulong = 2;

/// An open event device, read in blocking mode.
#[derive(Debug)]
pub struct DeviceSession {
    path: PathBuf,
    name: Option<String>,
    file: File,
}

impl DeviceSession {
    /// Open the event device at `path` read-only.
    pub fn open(path: impl Into<PathBuf>) -> KeyprobeResult<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| KeyprobeError::OpenDevice {
            path: path.clone(),
            source,
        })?;

        let name = match read_name(&file) {
            Ok(name) => Some(name),
            Err(e) => {
                debug!("cannot read the name of {}: {e}", path.display());
                None
            }
        };

        info!(
            "reading from {} ({})",
            path.display(),
            name.as_deref().unwrap_or("unknown")
        );

        Ok(Self { path, name, file })
    }

    /// The path of the device (e.g. `/dev/input/event3`).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The name the driver reports for the device, if it could be queried.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Hand the device over to an [`EventDecoder`].
    pub fn into_decoder(self, table: KeycodeTable, batch_size: usize) -> EventDecoder<File> {
        EventDecoder::with_batch_size(self.file, table, batch_size)
    }
}

/// What a device reports about itself. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub name: Option<String>,
    pub keyboard: bool,
}

/// Query the name and event types of the device at `path`.
pub fn device_capabilities(path: &Path) -> KeyprobeResult<DeviceCapabilities> {
    let file = open_nonblocking(path)?;
    let keyboard = read_event_flags(&file)
        .map(has_keyboard_flags)
        .unwrap_or(false);

    Ok(DeviceCapabilities {
        name: read_name(&file).ok(),
        keyboard,
    })
}

/// Open `path` read-only with `O_NONBLOCK` set.
pub(crate) fn open_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Read the name of the specified device using the `EVIOCGNAME` ioctl.
pub(crate) fn read_name(f: &File) -> KeyprobeResult<String> {
    const DEVICE_NAME_MAX_LEN: usize = 256;

    let mut device_name = [0u8; DEVICE_NAME_MAX_LEN];

    let eviocgname = (IOC_READ << IOC_DIRSHIFT)
        | (('E' as libc::c_ulong) << IOC_TYPESHIFT)
        | (0x06 << IOC_NRSHIFT)
        | ((device_name.len() as libc::c_ulong) << IOC_SIZESHIFT);

    ioctl(
        f.as_raw_fd(),
        eviocgname,
        device_name.as_mut_ptr() as *mut libc::c_ulong,
    )?;

    let len = device_name
        .iter()
        .position(|b| *b == 0)
        .unwrap_or(device_name.len());

    Ok(String::from_utf8_lossy(&device_name[..len]).into())
}

/// Read the event types supported by the specified device using the `EVIOCGBIT` ioctl.
pub(crate) fn read_event_flags(f: &File) -> KeyprobeResult<libc::c_ulong> {
    let mut ev_flags: libc::c_ulong = 0;

    let eviocgbit = (IOC_READ << IOC_DIRSHIFT)
        | (('E' as libc::c_ulong) << IOC_TYPESHIFT)
        | (0x20 << IOC_NRSHIFT)
        | ((mem::size_of::<libc::c_ulong>() as libc::c_ulong) << IOC_SIZESHIFT);

    ioctl(
        f.as_raw_fd(),
        eviocgbit,
        (&mut ev_flags) as *mut libc::c_ulong,
    )?;

    Ok(ev_flags)
}

/// Check whether the specified `flags` include every event type a keyboard emits.
fn has_keyboard_flags(flags: libc::c_ulong) -> bool {
    const KEYBOARD_FLAGS: libc::c_ulong =
        (1 << EV_SYN) | (1 << EV_KEY) | (1 << EV_MSC) | (1 << EV_REP);

    (flags & KEYBOARD_FLAGS) == KEYBOARD_FLAGS
}

fn ioctl(fd: RawFd, request: libc::c_ulong, buf: *mut libc::c_ulong) -> KeyprobeResult<()> {
    let res = unsafe { libc::ioctl(fd, request as _, buf) };

    if res < 0 {
        Err(io::Error::last_os_error().into())
    } else {
        Ok(())
    }
}
