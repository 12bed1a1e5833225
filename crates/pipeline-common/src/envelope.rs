//! The unit of flow through every stage: a value paired with an optional
//! error.

use crate::error::CoreError;

/// A value flowing through the pipeline, plus whatever error a stage
/// attached to it.
///
/// An envelope with `err.is_some()` still flows downstream unchanged by
/// default: stages may inspect `err` and decide to short-circuit their own
/// work (e.g. `Filter` dropping it, `Map` still invoking the transformer),
/// but nothing in the core silently swallows an errored envelope.
///
/// Envelopes are value-copied between stages. If `T` is itself a shared
/// reference (an `Arc<...>`), avoiding concurrent mutation across stages is
/// the producer's responsibility, not the envelope's.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub value: T,
    pub err: Option<CoreError>,
}

impl<T> Envelope<T> {
    /// Wrap a successful value.
    pub fn ok(value: T) -> Self {
        Self { value, err: None }
    }

    /// Wrap a value alongside an error that a stage wants to report without
    /// dropping the envelope.
    pub fn with_error(value: T, err: CoreError) -> Self {
        Self {
            value,
            err: Some(err),
        }
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Split into the success value, discarding any error.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Map the carried value, preserving the error (if any) unchanged.
    pub fn map_value<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            value: f(self.value),
            err: self.err,
        }
    }
}

impl<T: Default> Envelope<T> {
    /// Build a failed envelope carrying `T`'s zero value, for stages that
    /// short-circuit before producing a real value (e.g. a file that failed
    /// to open before any bytes were hashed).
    pub fn failed(err: CoreError) -> Self {
        Self {
            value: T::default(),
            err: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_has_no_error() {
        let e = Envelope::ok(5);
        assert!(e.is_ok());
        assert!(!e.is_err());
        assert_eq!(e.value, 5);
    }

    #[test]
    fn failed_envelope_uses_default_value() {
        let e: Envelope<u32> = Envelope::failed(CoreError::Validation("bad".into()));
        assert!(e.is_err());
        assert_eq!(e.value, 0);
    }

    #[test]
    fn map_value_preserves_error() {
        let e = Envelope::with_error(1, CoreError::Validation("x".into()));
        let mapped = e.map_value(|v| v * 10);
        assert_eq!(mapped.value, 10);
        assert!(mapped.is_err());
    }
}
