//! This crate finds the keyboard among the Linux event devices and decodes its raw scancodes
//! into key names.
//!
//! Event devices do not say what they are, so [`DeviceScanner`] asks the operator to press a
//! key and picks the first device in `/dev/input` that has data to read. Once the device is
//! known, an [`EventDecoder`] reads `input_event` records in batches and yields a
//! [`DecodedKey`] for every key press. Releases, autorepeats and non-key events are dropped.
//!
//! # Example
//!
//! Print the keys typed on a known device. Note reading event devices usually needs root
//! privileges.
//!
//! ```no_run
//! use keyprobe::{DeviceSession, KeycodeTable, KeyprobeError, DEFAULT_BATCH_SIZE};
//!
//! fn main() -> Result<(), KeyprobeError> {
//!     let session = DeviceSession::open("/dev/input/event3")?;
//!
//!     for key in session.into_decoder(KeycodeTable::default(), DEFAULT_BATCH_SIZE) {
//!         let key = key?;
//!         println!("{} {:?}", key.code, key.symbol);
//!     }
//!
//!     Ok(())
//! }
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("This crate only works on Linux");

mod capture;
mod error;
pub(crate) mod key_code;
mod keyboard;
pub mod output;
pub mod probe;
mod scanner;
pub mod terminal;

pub use capture::{until_terminated, KeyStream, Outcome, Termination};
pub use error::KeyprobeError;
pub use key_code::{KeycodeTable, TABLE_SIZE};
pub use keyboard::event_codes;
pub use keyboard::{
    device_capabilities, key_presses, DecodedKey, DeviceCapabilities, DeviceSession,
    EventDecoder, RawInputEvent, DEFAULT_BATCH_SIZE, INPUT_DIR, MAX_BATCH_SIZE, RECORD_SIZE,
};
pub use probe::{DeviceProbe, DeviceSource, InputDevices, Operator, ProbeResult, TerminalOperator};
pub use scanner::{candidates, DeviceScanner};

pub type KeyprobeResult<T> = Result<T, KeyprobeError>;
