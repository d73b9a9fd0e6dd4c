pub mod database;
pub mod evidence;
pub mod labels;
pub mod mass;
pub mod modification;
pub mod pepxml;
pub mod protxml;
pub mod psm;
pub mod report;
pub mod snapshot;

use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    Snapshot(bincode::Error),
    /// An input file, or the whole input set, produced no PSMs
    NoPsms(String),
    NoProteinGroups(String),
    MissingInput(String),
    InvalidModification(String),
    InvalidLayout(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Csv(e) => e.fmt(f),
            Self::Snapshot(e) => e.fmt(f),
            Self::NoPsms(s) => write!(f, "no PSMs found in {}", s),
            Self::NoProteinGroups(s) => write!(f, "no protein groups found in {}", s),
            Self::MissingInput(s) => write!(f, "missing input: {}", s),
            Self::InvalidModification(s) => write!(f, "invalid modification: {}", s),
            Self::InvalidLayout(s) => write!(f, "invalid isobaric layout: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Self::Snapshot(e)
    }
}

impl From<modification::InvalidModification> for Error {
    fn from(e: modification::InvalidModification) -> Self {
        Self::InvalidModification(e.to_string())
    }
}

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"),
        None => false,
    }
}

/// Read a whole file into a string, transparently decompressing gzip input
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MissingInput(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;
    let mut contents = String::new();
    if gzip_heuristic(path) {
        flate2::read::GzDecoder::new(BufReader::new(file)).read_to_string(&mut contents)?;
    } else {
        BufReader::new(file).read_to_string(&mut contents)?;
    }
    Ok(contents)
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn read_fasta<P, S>(path: P, decoy_tag: S) -> Result<database::Database, Error>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let contents = read_to_string(path)?;
    Ok(database::Database::parse(&contents, decoy_tag.as_ref()))
}
