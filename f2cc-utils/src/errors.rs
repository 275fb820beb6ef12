//! The error taxonomy produced by every stage of the compiler, from the
//! XML frontend through the synthesizer. Every error unwinds to the
//! driver, which logs one diagnostic line and exits non-zero; there is
//! no retry or partial-output path.
use crate::{GPosIdx, Id, WithPos};

/// Convenience wrapper for a result that may fail with a compiler [Error].
pub type F2ccResult<T> = std::result::Result<T, Error>;

/// An error produced by the compiler, carrying an optional source
/// position and an optional free-form elaboration message.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    pos: GPosIdx,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pos == GPosIdx::UNKNOWN {
            write!(f, "{}", self.kind)?
        } else {
            write!(f, "{}", self.pos.format(self.kind.to_string()))?
        }
        if let Some(post) = &self.post_msg {
            write!(f, "\n{}", post)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn with_pos<T: WithPos>(mut self, pos: &T) -> Self {
        self.pos = pos.copy_span();
        self
    }

    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            pos: GPosIdx::UNKNOWN,
            post_msg: None,
        }
    }

    /// A required argument to an internal operation was absent; programmer error.
    pub fn invalid_argument<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidArgument(msg.to_string()))
    }
    /// An input path could not be opened.
    pub fn file_not_found<S: ToString>(path: S) -> Self {
        Self::new(ErrorKind::FileNotFound(path.to_string()))
    }
    /// A transient filesystem failure while reading or writing.
    pub fn io<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Io(msg.to_string()))
    }
    /// An XML structural or schema violation.
    pub fn parse<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Parse(msg.to_string()))
    }
    /// A function prototype string embedded in the XML could not be parsed.
    pub fn invalid_format<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidFormat(msg.to_string()))
    }
    /// A §3 data-model invariant is violated, or a synthesizer
    /// precondition (missing type, array size, const/array mismatch) fails.
    pub fn invalid_model<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidModel(msg.to_string()))
    }
    /// A leaf variant's structural constraint is violated.
    pub fn invalid_process<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidProcess(msg.to_string()))
    }
    /// An IR element was encountered where its polymorphic variant does not fit.
    pub fn cast<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Cast(msg.to_string()))
    }
    /// An internal indexing invariant was broken.
    pub fn index_out_of_bounds<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds(msg.to_string()))
    }
    /// A named entity already exists, or is missing when assumed present.
    pub fn illegal_state<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::IllegalState(msg.to_string()))
    }
    /// Emission reached an array signal whose size could not be inferred.
    pub fn unknown_array_size(id: Id) -> Self {
        Self::new(ErrorKind::UnknownArraySize(id))
    }
    /// The requested feature exists in the grammar but is not yet implemented.
    pub fn not_supported<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::NotSupported(msg.to_string()))
    }
    /// Allocation failure.
    pub fn out_of_memory<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::OutOfMemory(msg.to_string()))
    }

    pub fn location(&self) -> (&str, usize, usize) {
        self.pos.get_location()
    }
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// The error taxonomy of §7. Each variant corresponds to one failure
/// class a pass or stage can report; there is no recovery within a pass.
#[derive(Clone)]
pub enum ErrorKind {
    InvalidArgument(String),
    FileNotFound(String),
    Io(String),
    Parse(String),
    InvalidFormat(String),
    InvalidModel(String),
    InvalidProcess(String),
    Cast(String),
    IndexOutOfBounds(String),
    IllegalState(String),
    UnknownArraySize(Id),
    NotSupported(String),
    OutOfMemory(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            FileNotFound(path) => write!(f, "File not found: {path}"),
            Io(msg) => write!(f, "I/O error: {msg}"),
            Parse(msg) => write!(f, "Parse error: {msg}"),
            InvalidFormat(msg) => write!(f, "Invalid function format: {msg}"),
            InvalidModel(msg) => write!(f, "Invalid model: {msg}"),
            InvalidProcess(msg) => write!(f, "Invalid process: {msg}"),
            Cast(msg) => write!(f, "Cast error: {msg}"),
            IndexOutOfBounds(msg) => {
                write!(f, "Index out of bounds: {msg}")
            }
            IllegalState(msg) => write!(f, "Illegal state: {msg}"),
            UnknownArraySize(id) => {
                write!(f, "Unknown array size for signal at `{id}'")
            }
            NotSupported(msg) => write!(f, "Not supported: {msg}"),
            OutOfMemory(msg) => write!(f, "Out of memory: {msg}"),
        }
    }
}

// Conversions from other error types so that `?` works throughout the
// frontend, rewriter, scheduler, and synthesizer.
impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::parse(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::file_not_found(e.to_string())
        } else {
            Error::io(e.to_string())
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::parse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::parse(e.to_string())
    }
}
