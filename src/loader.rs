/*!
    initialization file for analog channels

    one record per line, a 1-based analog address followed by its value, separated by whitespaces. `#`, `//` and `;` start a comment running to the end of the line.

    ```text
    # address value
    5   1000    // water level
    12  512
    ```

    bad lines are reported and skipped, they never stop the loading of the following ones. Lines are not required to be valid UTF-8, invalid sequences simply fail to parse as numbers. Values wider than 10 bits are masked when stored, up to 64 bits wide.
*/

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    string::{String, ToString},
    vec::Vec,
    };
use log::*;
use thiserror::Error;

use crate::store::{ChannelStore, AddressError};


const COMMENT_MARKERS: [&str; 3] = ["#", "//", ";"];

/// one valid line of the initialization file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// 1-based analog address
    pub address: u16,
    /// raw value, truncated to 10 bits when stored
    pub value: u64,
}

/// reason for skipping a line
#[derive(Error, Clone, Debug, PartialEq)]
pub enum LineError {
    #[error("expected an address and a value")]
    MissingField,
    #[error("{0:?} is not an unsigned integer")]
    InvalidInteger(String),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// failure of the whole loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open {path:?}: {source}")]
    Open {path: PathBuf, source: io::Error},
    #[error("cannot read line {line}: {source}")]
    Read {line: usize, source: io::Error},
}

/// outcome of a loading
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    /// number of records stored
    pub applied: usize,
    /// lines not stored, by 1-based line number
    pub skipped: Vec<(usize, LineError)>,
}


/// content of a line before its first comment marker, without surrounding whitespaces
pub fn strip_comment(line: &str) -> &str {
    let end = COMMENT_MARKERS.iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    line[.. end].trim()
}

/// record on the given line, `None` if there is nothing but comments and whitespaces
pub fn parse_line(line: &str) -> Result<Option<Record>, LineError> {
    let line = strip_comment(line);
    if line.is_empty()
        {return Ok(None)}
    let mut fields = line.split_whitespace();
    let (Some(address), Some(value)) = (fields.next(), fields.next())
        else {return Err(LineError::MissingField)};
    Ok(Some(Record {
        address: address.parse().map_err(|_| LineError::InvalidInteger(address.to_string()))?,
        value: value.parse().map_err(|_| LineError::InvalidInteger(value.to_string()))?,
    }))
}

fn apply_line(line: &str, store: &mut ChannelStore) -> Result<Option<Record>, LineError> {
    let Some(record) = parse_line(line)?
        else {return Ok(None)};
    // bits above the 10 stored ones are dropped anyway
    store.set_analog(record.address, record.value as u32)?;
    Ok(Some(record))
}

/// set analog channels from the records of the given file
pub fn load(path: impl AsRef<Path>, store: &mut ChannelStore) -> Result<Summary, LoadError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|source| LoadError::Open {path: path.to_path_buf(), source})?;
    let summary = load_from(BufReader::new(file), store)?;
    info!("loaded {:?}: {} channels set, {} lines skipped", path, summary.applied, summary.skipped.len());
    Ok(summary)
}

/**
    set analog channels from records read line by line

    only a failure of the reader itself stops the loading, records already read stay applied
*/
pub fn load_from(mut reader: impl BufRead, store: &mut ChannelStore) -> Result<Summary, LoadError> {
    let mut summary = Summary::default();
    let mut raw = Vec::new();
    for number in 1 .. {
        raw.clear();
        let size = reader.read_until(b'\n', &mut raw)
            .map_err(|source| LoadError::Read {line: number, source})?;
        if size == 0
            {break}
        let line = String::from_utf8_lossy(&raw);
        match apply_line(&line, store) {
            Ok(Some(record)) => {
                debug!("line {}: analog channel {} set to {}", number, record.address, record.value);
                summary.applied += 1;
            },
            Ok(None) => {},
            Err(error) => {
                warn!("skipping line {}: {}: {}", number, error, strip_comment(&line));
                summary.skipped.push((number, error));
            },
        }
    }
    Ok(summary)
}
