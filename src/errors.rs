use std::{fmt, io, num::{ParseFloatError, ParseIntError, TryFromIntError}, str::Utf8Error};
use quick_xml::events::attributes::AttrError;

/// What went wrong, which also decides whether the pipeline can carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The boundary region cannot produce a canvas. Fatal.
    DegenerateRegion,
    /// A shape identifier is unknown to the shape provider. Recovered with the default shape.
    ShapeNotFound,
    /// One element carries unusable data. Recovered by skipping or defaulting.
    MalformedElement,
    /// The style scheme file is invalid. Fatal at load time.
    Scheme,
    /// Reading input or writing output failed.
    Input,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DegenerateRegion => "degenerate_region",
            ErrorKind::ShapeNotFound => "shape_not_found",
            ErrorKind::MalformedElement => "malformed_element",
            ErrorKind::Scheme => "scheme",
            ErrorKind::Input => "input",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn degenerate_region(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DegenerateRegion, message)
    }

    pub fn shape_not_found(shape_id: &str) -> Self {
        Self::new(ErrorKind::ShapeNotFound, format!("No shape with id `{}`", shape_id))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedElement, message)
    }

    pub fn scheme(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Scheme, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::new(ErrorKind::Input, value.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error::new(ErrorKind::Input, value.to_string())
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error::new(ErrorKind::Input, value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::new(ErrorKind::Input, value.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Error::new(ErrorKind::Scheme, value.to_string())
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error::new(ErrorKind::MalformedElement, value.to_string())
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error::new(ErrorKind::MalformedElement, value.to_string())
    }
}

impl From<TryFromIntError> for Error {
    fn from(value: TryFromIntError) -> Self {
        Error::new(ErrorKind::MalformedElement, value.to_string())
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::new(ErrorKind::Input, value.to_string())
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::new(ErrorKind::Input, value)
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::new(ErrorKind::Input, value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
