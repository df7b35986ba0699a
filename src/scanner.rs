use crate::error::KeyprobeError;
use crate::probe::{DeviceProbe, DeviceSource, Operator, ProbeResult};
use crate::KeyprobeResult;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Finds the first device in a directory that answers a probe.
#[derive(Debug)]
pub struct DeviceScanner<S, O> {
    probe: DeviceProbe<S, O>,
}

impl<S: DeviceSource, O: Operator> DeviceScanner<S, O> {
    pub fn new(source: S, operator: O) -> Self {
        Self {
            probe: DeviceProbe::new(source, operator),
        }
    }

    /// Probe every entry of `dir` in name order and return the first match.
    ///
    /// Failing to list `dir` is the only fatal error. Entries that cannot be opened and
    /// operator input failures are absorbed, and `Ok(None)` is returned if nothing matched.
    pub fn scan(&mut self, dir: &Path) -> KeyprobeResult<Option<PathBuf>> {
        let entries = candidates(dir)?;

        let operator = self.probe.operator();
        operator.notify(&format!("scanning for devices in {}", dir.display()));
        operator.notify("* NOTE: please hold down the enter key to provide test data *");
        if let Err(e) = operator.wait_for_key() {
            warn!("no operator input before scanning: {e}");
        }

        for path in entries {
            self.probe
                .operator()
                .notify(&format!("\ttrying {}", path.display()));

            match self.probe.probe(&path) {
                ProbeResult::Match => {
                    info!("{} responded to the probe", path.display());
                    return Ok(Some(path));
                }
                result => debug!("{}: {result:?}", path.display()),
            }
        }

        Ok(None)
    }
}

/// List the entries of `dir` that are worth probing, sorted by name.
pub fn candidates(dir: &Path) -> KeyprobeResult<Vec<PathBuf>> {
    let read_dir = fs::read_dir(dir).map_err(|source| KeyprobeError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect::<Vec<_>>();

    entries.sort();

    Ok(entries)
}
