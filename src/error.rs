use std::fmt::Display;

#[derive(Debug)]
pub enum Error {
    /// I/O failure, malformed image, or internal inconsistency
    General,
    /// Target already exists or allocation failed during create
    Create,
    NoSuchFile,
    NoSuchDir,
    /// File is currently open
    InUse,
    /// Open-file table is full
    TooManyOpen,
    /// Descriptor out of range or refers to a closed slot
    BadDescriptor,
    /// Sector bitmap exhausted
    NoSpace,
    /// Write would exceed the maximum file size
    FileTooBig,
    SeekOutOfBounds,
    /// Directory still has entries
    NotEmpty,
    /// Attempt to remove the root directory
    RootDir,
    /// Caller's buffer cannot hold the directory entries
    BufferTooSmall,
    Io(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general failure"),
            Self::Create => write!(f, "create failed"),
            Self::NoSuchFile => write!(f, "no such file"),
            Self::NoSuchDir => write!(f, "no such directory"),
            Self::InUse => write!(f, "file in use"),
            Self::TooManyOpen => write!(f, "too many open files"),
            Self::BadDescriptor => write!(f, "bad file descriptor"),
            Self::NoSpace => write!(f, "no space left on disk"),
            Self::FileTooBig => write!(f, "file too big"),
            Self::SeekOutOfBounds => write!(f, "seek out of bounds"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::RootDir => write!(f, "cannot remove root directory"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
