use std::path::PathBuf;

use thiserror::Error;
use wsltools_platform::WslError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot find wsl.exe, install it first")]
    EnvironmentUnavailable,

    #[error("unknown distribution: {0}")]
    NotFound(String),

    #[error(transparent)]
    Wsl(#[from] WslError),

    #[error("failed to resolve {path}: {source}")]
    PathResolutionFailed { path: String, source: WslError },

    #[error("no nameserver entry in /etc/resolv.conf")]
    IpNotFound,

    #[error("no passwd entry with home directory {0}")]
    ShellNotFound(String),

    #[error("scale factor {0} not allowed, choose 1 or 2")]
    InvalidScale(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to parse desktop entry {path}: {message}")]
    DesktopEntry { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
