//! Binary snapshots of intermediate pipeline state.
//!
//! Snapshots carry no version tag; a structure that fails to decode is
//! treated as absent by [`restore_or_default`].

use crate::Error;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const DATABASE: &str = "db.bin";
pub const PEPXML: &str = "pepxml.bin";
pub const PROTXML: &str = "protxml.bin";

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn store<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), Error> {
    let file = std::fs::File::create(path.as_ref())?;
    bincode::serialize_into(BufWriter::new(file), value)?;
    log::trace!("stored snapshot {}", path.as_ref().display());
    Ok(())
}

pub fn restore<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingInput(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

/// Restore a snapshot, falling back to an empty structure. Lookups against
/// the fallback return empty values rather than errors.
pub fn restore_or_default<P: AsRef<Path>, T: DeserializeOwned + Default>(path: P) -> T {
    match restore(path.as_ref()) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "failed to restore snapshot {}: {}",
                path.as_ref().display(),
                e
            );
            T::default()
        }
    }
}
