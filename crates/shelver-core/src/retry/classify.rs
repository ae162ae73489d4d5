//! Classify filesystem errors into retry policy error kinds.

use std::io;

use super::policy::ErrorKind;

#[cfg(unix)]
const EBUSY: i32 = 16;
#[cfg(unix)]
const ETXTBSY: i32 = 26;

/// Classify an I/O error for retry decisions.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    #[cfg(unix)]
    if matches!(e.raw_os_error(), Some(EBUSY) | Some(ETXTBSY)) {
        return ErrorKind::Busy;
    }
    match e.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            ErrorKind::Transient
        }
        io::ErrorKind::PermissionDenied => ErrorKind::Busy,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_and_timeout_are_transient() {
        let e = io::Error::new(io::ErrorKind::Interrupted, "x");
        assert_eq!(classify_io_error(&e), ErrorKind::Transient);
        let e = io::Error::new(io::ErrorKind::TimedOut, "x");
        assert_eq!(classify_io_error(&e), ErrorKind::Transient);
    }

    #[cfg(unix)]
    #[test]
    fn ebusy_is_busy() {
        let e = io::Error::from_raw_os_error(EBUSY);
        assert_eq!(classify_io_error(&e), ErrorKind::Busy);
    }

    #[test]
    fn not_found_is_other() {
        let e = io::Error::new(io::ErrorKind::NotFound, "x");
        assert_eq!(classify_io_error(&e), ErrorKind::Other);
    }
}
