use super::sanitize;
use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Whether the storage the library lives on can hold files of 4 GiB or more
/// (FAT32 cannot). Reported by an external prober.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileSystemCapability {
    /// The prober has not finished (or could not decide).
    #[default]
    Unknown,
    CanWriteLargeFiles,
    CannotWriteLargeFiles,
}

impl FileSystemCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::CanWriteLargeFiles => "can-write-large-files",
            Self::CannotWriteLargeFiles => "cannot-write-large-files",
        }
    }
}

impl FromStr for FileSystemCapability {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "unknown" => Self::Unknown,
            "canwritelargefiles" | "large" | "yes" => Self::CanWriteLargeFiles,
            "cannotwritelargefiles" | "fat32" | "no" => Self::CannotWriteLargeFiles,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "filesystem capability",
                value: s.to_string()
            }),
        })
    }
}

impl Display for FileSystemCapability {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Connectivity as reported by the connectivity observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetworkState {
    Connected,
    #[default]
    Disconnected,
}

impl NetworkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
