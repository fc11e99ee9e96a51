use std::fmt;

#[derive(Debug)]
pub struct Error(Repr);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Allocation failed even after a collection,
    // or the pool itself could not be reserved
    OutOfMemory,
    InvalidHandle,
    // The object graph is broken. The heap is poisoned
    // once this is raised during a collection
    CorruptReference,
    IncorrectType,
    BadFormat,
    BadConfig,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            OutOfMemory => "out of memory",
            InvalidHandle => "invalid handle",
            CorruptReference => "corrupt reference",
            IncorrectType => "incorrect type",
            BadFormat => "bad format",
            BadConfig => "bad configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error(Repr::Custom(kind, error.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            Repr::Custom(c, _) => *c,
            Repr::Simple(c) => *c,
            Repr::SimpleMessage(c, _) => *c,
        }
    }

    pub fn new_const(kind: ErrorKind, message: &'static str) -> Self {
        Error(Repr::SimpleMessage(kind, message))
    }
}

impl From<ErrorKind> for Error {
    fn from(e: ErrorKind) -> Self {
        Error(Repr::Simple(e))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Simple(kind) => write!(f, "{}", kind),
            Repr::SimpleMessage(kind, msg) => write!(f, "{}: {}", kind, msg),
            Repr::Custom(kind, err) => write!(f, "{}: {}", kind, err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            Repr::Custom(_, err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Repr {
    Simple(ErrorKind),
    SimpleMessage(ErrorKind, &'static str),
    Custom(ErrorKind, Box<dyn std::error::Error + Send + Sync>),
}
