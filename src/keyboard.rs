pub(crate) mod device;
pub mod event_codes;

use crate::error::KeyprobeError;
use crate::key_code::KeycodeTable;
use crate::KeyprobeResult;
use chrono::{DateTime, Utc};
use event_codes::{EV_KEY, KEY_PRESS};
use log::warn;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::{mem, ptr, slice};

pub use device::{device_capabilities, DeviceCapabilities, DeviceSession, INPUT_DIR};

/// The size of one `input_event` record as delivered by the kernel.
pub const RECORD_SIZE: usize = mem::size_of::<libc::input_event>();

/// The number of records requested by each read of the device.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Batch sizes are clamped to `1..=MAX_BATCH_SIZE` records.
pub const MAX_BATCH_SIZE: usize = 1024;

/// One raw record read from an event device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    /// Seconds part of the event timestamp.
    pub sec: i64,
    /// Microseconds part of the event timestamp.
    pub usec: i64,
    /// The event type (`EV_KEY`, `EV_SYN`, ...).
    pub kind: u16,
    /// The scancode (for `EV_KEY`) or axis identifier.
    pub code: u16,
    /// For `EV_KEY`: 0 = release, 1 = press, 2 = autorepeat.
    pub value: i32,
}

impl From<&libc::input_event> for RawInputEvent {
    fn from(ev: &libc::input_event) -> Self {
        Self {
            sec: ev.time.tv_sec as i64,
            usec: ev.time.tv_usec as i64,
            kind: ev.type_,
            code: ev.code,
            value: ev.value,
        }
    }
}

impl RawInputEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            sec: 0,
            usec: 0,
            kind,
            code,
            value,
        }
    }

    /// Decode a record from the first [`RECORD_SIZE`] bytes of `record`.
    ///
    /// Returns `None` if `record` is too short to hold a whole record.
    pub fn from_bytes(record: &[u8]) -> Option<Self> {
        if record.len() < RECORD_SIZE {
            return None;
        }

        // SAFETY: `record` holds at least `RECORD_SIZE` bytes, and `input_event` is plain old
        // data, so any bit pattern is a valid value.
        let ev = unsafe { ptr::read_unaligned(record.as_ptr() as *const libc::input_event) };

        Some(Self::from(&ev))
    }

    /// Encode the record in the kernel's binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let ev = libc::input_event {
            time: libc::timeval {
                tv_sec: self.sec as libc::time_t,
                tv_usec: self.usec as libc::suseconds_t,
            },
            type_: self.kind,
            code: self.code,
            value: self.value,
        };

        // SAFETY: `ev` is a live, fully initialized `input_event` without padding.
        let bytes =
            unsafe { slice::from_raw_parts(&ev as *const libc::input_event as *const u8, RECORD_SIZE) };

        bytes.to_vec()
    }

    /// Whether this is an EV_KEY transition to the pressed state.
    ///
    /// Releases (0) and autorepeats (2) do not count.
    pub fn is_key_press(&self) -> bool {
        self.kind == EV_KEY && self.value == KEY_PRESS
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        let nsec = u32::try_from(self.usec.checked_mul(1000)?).ok()?;

        DateTime::from_timestamp(self.sec, nsec)
    }
}

/// A key press decoded from the device stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    /// The raw scancode.
    pub code: u16,
    /// The symbolic name of the key, if the table has one.
    pub symbol: Option<&'static str>,
    /// When the kernel recorded the press.
    pub time: Option<DateTime<Utc>>,
}

/// Select the key presses from `events`, in order, and decode them with `table`.
pub fn key_presses<'a, I>(events: I, table: &'a KeycodeTable) -> impl Iterator<Item = DecodedKey> + 'a
where
    I: IntoIterator<Item = RawInputEvent>,
    I::IntoIter: 'a,
{
    events
        .into_iter()
        .filter(RawInputEvent::is_key_press)
        .map(move |ev| DecodedKey {
            code: ev.code,
            symbol: table.lookup(ev.code),
            time: ev.timestamp(),
        })
}

/// Turns the byte stream of an event device into decoded key presses.
///
/// Each read asks for a whole batch of records. A read returning less than one record is
/// fatal: the iterator yields the error once and then ends.
#[derive(Debug)]
pub struct EventDecoder<R> {
    reader: R,
    table: KeycodeTable,
    buf: Vec<u8>,
    pending: VecDeque<DecodedKey>,
    failed: bool,
}

impl<R: Read> EventDecoder<R> {
    pub fn new(reader: R, table: KeycodeTable) -> Self {
        Self::with_batch_size(reader, table, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(reader: R, table: KeycodeTable, batch_size: usize) -> Self {
        Self {
            reader,
            table,
            buf: vec![0; batch_size.clamp(1, MAX_BATCH_SIZE) * RECORD_SIZE],
            pending: VecDeque::new(),
            failed: false,
        }
    }

    /// Perform one read of the device and return the key presses it contained.
    pub fn read_batch(&mut self) -> KeyprobeResult<Vec<DecodedKey>> {
        let n = loop {
            match self.reader.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(KeyprobeError::ReadDevice(e)),
            }
        };

        if n < RECORD_SIZE {
            return Err(KeyprobeError::ShortRead {
                read: n,
                expected: RECORD_SIZE,
            });
        }

        let trailing = n % RECORD_SIZE;
        if trailing != 0 {
            warn!("discarding {trailing} trailing bytes of a partial input_event");
        }

        let events = self.buf[..n]
            .chunks_exact(RECORD_SIZE)
            .filter_map(RawInputEvent::from_bytes);

        Ok(key_presses(events, &self.table).collect())
    }
}

impl<R: Read> Iterator for EventDecoder<R> {
    type Item = KeyprobeResult<DecodedKey>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                return Some(Ok(key));
            }

            if self.failed {
                return None;
            }

            match self.read_batch() {
                Ok(keys) => self.pending.extend(keys),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::event_codes::{EV_MSC, EV_SYN, KEY_RELEASE, KEY_REPEAT};
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn encode(events: &[RawInputEvent]) -> Vec<u8> {
        events.iter().flat_map(RawInputEvent::to_bytes).collect()
    }

    fn codes(decoder: EventDecoder<impl Read>) -> Vec<u16> {
        decoder
            .take_while(Result::is_ok)
            .map(|key| key.unwrap().code)
            .collect()
    }

    /// Hands out its chunks one `read` call at a time.
    struct Chunked(VecDeque<Vec<u8>>);

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    #[test]
    fn record_layout_survives_encoding() {
        let ev = RawInputEvent {
            sec: 1_700_000_000,
            usec: 250_000,
            kind: EV_KEY,
            code: 30,
            value: KEY_PRESS,
        };

        let bytes = ev.to_bytes();

        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(RawInputEvent::from_bytes(&bytes), Some(ev));
        assert_eq!(RawInputEvent::from_bytes(&bytes[1..]), None);
    }

    #[test]
    fn press_repeat_sync_yields_one_key() {
        let bytes = encode(&[
            RawInputEvent::new(EV_KEY, 30, KEY_PRESS),
            RawInputEvent::new(EV_KEY, 30, KEY_REPEAT),
            RawInputEvent::new(EV_SYN, 0, 0),
        ]);
        let mut decoder = EventDecoder::new(Cursor::new(bytes), KeycodeTable::default());

        let keys = decoder.read_batch().unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, 30);
        assert_eq!(keys[0].symbol, Some("a"));
    }

    #[test]
    fn releases_and_other_event_types_are_ignored() {
        let bytes = encode(&[
            RawInputEvent::new(EV_MSC, 4, 0x70004),
            RawInputEvent::new(EV_KEY, 30, KEY_RELEASE),
            RawInputEvent::new(EV_SYN, 0, 0),
            // A non-key event that happens to carry value 1
            RawInputEvent::new(EV_MSC, 30, KEY_PRESS),
        ]);
        let mut decoder = EventDecoder::new(Cursor::new(bytes), KeycodeTable::default());

        assert!(decoder.read_batch().unwrap().is_empty());
    }

    #[test]
    fn unmapped_codes_are_still_emitted() {
        let bytes = encode(&[RawInputEvent::new(EV_KEY, 0x2ff, KEY_PRESS)]);
        let mut decoder = EventDecoder::new(Cursor::new(bytes), KeycodeTable::default());

        let keys = decoder.read_batch().unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, 0x2ff);
        assert_eq!(keys[0].symbol, None);
    }

    #[test]
    fn short_read_is_fatal() {
        let mut decoder = EventDecoder::new(
            Cursor::new(vec![0u8; RECORD_SIZE - 1]),
            KeycodeTable::default(),
        );

        match decoder.read_batch() {
            Err(KeyprobeError::ShortRead { read, expected }) => {
                assert_eq!(read, RECORD_SIZE - 1);
                assert_eq!(expected, RECORD_SIZE);
            }
            other => panic!("expected a short read, got {other:?}"),
        }
    }

    #[test]
    fn iterator_ends_after_first_error() {
        let bytes = encode(&[RawInputEvent::new(EV_KEY, 2, KEY_PRESS)]);
        let mut decoder = EventDecoder::new(Cursor::new(bytes), KeycodeTable::default());

        assert_eq!(decoder.next().unwrap().unwrap().code, 2);
        assert!(matches!(
            decoder.next(),
            Some(Err(KeyprobeError::ShortRead { read: 0, .. }))
        ));
        assert!(decoder.next().is_none());
        assert!(decoder.next().is_none());
    }

    #[test]
    fn read_errors_are_fatal() {
        struct Revoked;

        impl Read for Revoked {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from_raw_os_error(libc::ENODEV))
            }
        }

        let mut decoder = EventDecoder::new(Revoked, KeycodeTable::default());

        assert!(matches!(decoder.next(), Some(Err(KeyprobeError::ReadDevice(_)))));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn interrupted_reads_are_retried() {
        struct InterruptedOnce(bool, Cursor<Vec<u8>>);

        impl Read for InterruptedOnce {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.0 {
                    self.0 = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                self.1.read(buf)
            }
        }

        let bytes = encode(&[RawInputEvent::new(EV_KEY, 31, KEY_PRESS)]);
        let mut decoder =
            EventDecoder::new(InterruptedOnce(false, Cursor::new(bytes)), KeycodeTable::default());

        assert_eq!(decoder.read_batch().unwrap()[0].symbol, Some("s"));
    }

    #[test]
    fn order_is_kept_across_batches() {
        let reader = Chunked(VecDeque::from(vec![
            encode(&[
                RawInputEvent::new(EV_KEY, 35, KEY_PRESS),
                RawInputEvent::new(EV_SYN, 0, 0),
                RawInputEvent::new(EV_KEY, 35, KEY_RELEASE),
                RawInputEvent::new(EV_KEY, 18, KEY_PRESS),
            ]),
            encode(&[
                RawInputEvent::new(EV_KEY, 38, KEY_PRESS),
                RawInputEvent::new(EV_KEY, 38, KEY_REPEAT),
            ]),
        ]));

        let decoder = EventDecoder::with_batch_size(reader, KeycodeTable::default(), 4);

        assert_eq!(codes(decoder), vec![35, 18, 38]);
    }

    #[test]
    fn batch_size_is_clamped() {
        let table = KeycodeTable::default();

        let huge = EventDecoder::with_batch_size(io::empty(), table, usize::MAX);
        assert_eq!(huge.buf.len(), MAX_BATCH_SIZE * RECORD_SIZE);

        let empty = EventDecoder::with_batch_size(io::empty(), table, 0);
        assert_eq!(empty.buf.len(), RECORD_SIZE);
    }

    #[test]
    fn partial_trailing_record_is_dropped() {
        let mut bytes = encode(&[RawInputEvent::new(EV_KEY, 30, KEY_PRESS)]);
        bytes.extend_from_slice(&[0xff; 5]);
        let mut decoder = EventDecoder::new(Cursor::new(bytes), KeycodeTable::default());

        let keys = decoder.read_batch().unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, 30);
    }

    #[test]
    fn timestamp_is_carried() {
        let ev = RawInputEvent {
            sec: 1_000,
            usec: 5,
            kind: EV_KEY,
            code: 30,
            value: KEY_PRESS,
        };
        let table = KeycodeTable::default();

        let key = key_presses([ev], &table).next().unwrap();

        assert_eq!(key.time, DateTime::from_timestamp(1_000, 5_000));
    }

    fn arb_event() -> impl Strategy<Value = RawInputEvent> {
        (
            prop_oneof![Just(EV_SYN), Just(EV_KEY), Just(EV_MSC)],
            0u16..300,
            0i32..3,
        )
            .prop_map(|(kind, code, value)| RawInputEvent::new(kind, code, value))
    }

    proptest! {
        #[test]
        fn only_presses_are_emitted_in_order(
            events in proptest::collection::vec(arb_event(), 1..DEFAULT_BATCH_SIZE)
        ) {
            let expected: Vec<u16> = events
                .iter()
                .filter(|ev| ev.kind == EV_KEY && ev.value == KEY_PRESS)
                .map(|ev| ev.code)
                .collect();
            let mut decoder = EventDecoder::new(Cursor::new(encode(&events)), KeycodeTable::default());

            let keys = decoder.read_batch().unwrap();

            prop_assert_eq!(keys.iter().map(|k| k.code).collect::<Vec<_>>(), expected);
        }
    }
}
