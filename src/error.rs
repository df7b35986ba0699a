use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyprobeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot list input device directory {}: {source}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot open input device {}: {source}", path.display())]
    OpenDevice {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read() from input device failed: {0}")]
    ReadDevice(#[source] io::Error),
    #[error("short read from input device: got {read} bytes, expected at least {expected}")]
    ShortRead { read: usize, expected: usize },
    #[error("{op} failed: {source}")]
    Terminal {
        op: &'static str,
        #[source]
        source: nix::Error,
    },
    #[error("no keyboard device found in {}", .0.display())]
    NoDeviceFound(PathBuf),
    #[error("the event decoder exited")]
    DecoderExited,
}
