//! Error handling

use core::fmt::{self, Display, Formatter};
use core::num::NonZeroI32;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Errno-style codes used across the stack surface (newlib numbering).
#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    Io = 5,
    NoExec = 8,
    WouldBlock = 11,
    NoMem = 12,
    NoDev = 19,
    InvalidArg = 22,
    BadMessage = 74,
    ConnReset = 104,
    ConnRefused = 111,
    ConnAborted = 113,
    TimedOut = 116,
    NotConnected = 128,
}

impl ErrorCode {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Io => "EIO",
            Self::NoExec => "ENOEXEC",
            Self::WouldBlock => "EAGAIN",
            Self::NoMem => "ENOMEM",
            Self::NoDev => "ENODEV",
            Self::InvalidArg => "EINVAL",
            Self::BadMessage => "EBADMSG",
            Self::ConnReset => "ECONNRESET",
            Self::ConnRefused => "ECONNREFUSED",
            Self::ConnAborted => "ECONNABORTED",
            Self::TimedOut => "ETIMEDOUT",
            Self::NotConnected => "ENOTCONN",
        }
    }
}

/// A numeric error reported by the network stack surface.
///
/// Wraps a nonzero errno-style code. The symbolic [`ErrorCode`] is recovered
/// through [`NetError::kind`] when the code is a known one; unknown codes are
/// carried through verbatim (a connect attempt, for instance, reports
/// whatever status the driver delivered).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetError(NonZeroI32);

impl NetError {
    /// `None` when `code` is zero, i.e. not an error.
    pub fn from_code(code: i32) -> Option<Self> {
        NonZeroI32::new(code).map(Self)
    }

    pub fn from_kind(kind: ErrorCode) -> Self {
        match NonZeroI32::new(kind.into()) {
            Some(code) => Self(code),
            None => unreachable!("error codes are nonzero"),
        }
    }

    pub fn code(&self) -> i32 {
        self.0.get()
    }

    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::try_from(self.code()).ok()
    }
}

impl From<ErrorCode> for NetError {
    fn from(kind: ErrorCode) -> Self {
        Self::from_kind(kind)
    }
}

impl Display for NetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{} (errno {})", kind.symbol(), self.code()),
            None => write!(f, "errno {}", self.code()),
        }
    }
}

impl std::error::Error for NetError {}

// Mapped by `io::ErrorKind`, never by the raw OS errno; the numeric surface
// must not vary across host platforms.
impl From<std::io::Error> for NetError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => ErrorCode::TimedOut,
            ErrorKind::ConnectionRefused => ErrorCode::ConnRefused,
            ErrorKind::ConnectionAborted => ErrorCode::ConnAborted,
            ErrorKind::ConnectionReset => ErrorCode::ConnReset,
            ErrorKind::NotConnected => ErrorCode::NotConnected,
            ErrorKind::InvalidInput | ErrorKind::AddrNotAvailable => ErrorCode::InvalidArg,
            ErrorKind::OutOfMemory => ErrorCode::NoMem,
            _ => ErrorCode::Io,
        };

        Self::from_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_error() {
        assert_eq!(NetError::from_code(0), None);
    }

    #[test]
    fn known_codes_round_trip() {
        let err = NetError::from_code(113).unwrap();
        assert_eq!(err.kind(), Some(ErrorCode::ConnAborted));
        assert_eq!(NetError::from_kind(ErrorCode::ConnAborted), err);
        assert_eq!(err.to_string(), "ECONNABORTED (errno 113)");
    }

    #[test]
    fn unknown_codes_are_carried_verbatim() {
        let err = NetError::from_code(42).unwrap();
        assert_eq!(err.kind(), None);
        assert_eq!(err.code(), 42);
        assert_eq!(err.to_string(), "errno 42");
    }

    #[test]
    fn io_errors_map_by_kind() {
        use std::io;

        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(NetError::from(refused).kind(), Some(ErrorCode::ConnRefused));

        let would_block = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(NetError::from(would_block).kind(), Some(ErrorCode::TimedOut));

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(NetError::from(other).kind(), Some(ErrorCode::Io));
    }
}
