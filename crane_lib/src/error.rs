use thiserror::Error;

/// A locally constructed value breaks a declared range or is not a finite number.
///
/// Commands failing validation are never transmitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("`{field}` must be a finite number")]
    NonFinite { field: &'static str },

    #[error("`{field}` = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// An inbound payload failed shape validation and was dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("payload does not match the expected shape: {0}")]
    Malformed(serde_json::Error),

    #[error("`{0}` is not a JSON object")]
    NotAnObject(&'static str),

    #[error("missing or non-string `{0}` field")]
    MissingField(&'static str),

    #[error("unknown status `{0}`")]
    UnknownStatus(String),

    #[error("unknown command type `{0}`")]
    UnknownType(String),

    #[error("`{object}.{field}` is missing or not a finite number")]
    BadNumber {
        object: &'static str,
        field: &'static str,
    },
}

/// A value could not be turned into a wire message.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not serialize message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the link to the motion backend.
///
/// These describe connectivity only and never change the reported crane status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("timed out connecting to {0}")]
    Timeout(String),

    #[error("connection is closed")]
    Closed,
}

/// Check that `value` is finite, naming `field` in the error.
pub fn ensure_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

/// Check that `value` is finite and lies within `[min, max]`.
pub fn ensure_in_range(
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
) -> Result<(), ValidationError> {
    ensure_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        assert!(ensure_in_range("swing", 0.0, (-180.0, 180.0)).is_ok());
        assert!(ensure_in_range("swing", 180.0, (-180.0, 180.0)).is_ok());
        assert!(ensure_in_range("swing", -180.0, (-180.0, 180.0)).is_ok());
        assert_eq!(
            ensure_in_range("swing", 180.5, (-180.0, 180.0)),
            Err(ValidationError::OutOfRange {
                field: "swing",
                value: 180.5,
                min: -180.0,
                max: 180.0,
            })
        );
        assert_eq!(
            ensure_in_range("lift", f64::NAN, (0.0, 2.0)),
            Err(ValidationError::NonFinite { field: "lift" })
        );
        assert!(ensure_finite("x", f64::INFINITY).is_err());
    }
}
