//! Bounded retries for blob store calls.

use pmkt_crypto::BlobError;

/// Run `op` up to `attempts` times, retrying only transient failures.
pub(crate) fn with_retries<T>(
    attempts: u32,
    what: &str,
    mut op: impl FnMut() -> Result<T, BlobError>,
) -> Result<T, BlobError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                tracing::warn!(operation = what, attempt, error = %err, "blob store call failed, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn transient_failures_are_retried() {
        let calls = Cell::new(0);
        let out = with_retries(3, "fetch", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(BlobError::Unavailable("down".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_attempts() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retries(2, "fetch", || {
            calls.set(calls.get() + 1);
            Err(BlobError::Unavailable("down".into()))
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retries(5, "write", || {
            calls.set(calls.get() + 1);
            Err(BlobError::InvalidLocator("x".into()))
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }
}
