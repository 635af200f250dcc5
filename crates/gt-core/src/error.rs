use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Value for {what} out of range: {value} (expected {range})")]
    OutOfRange {
        what: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("Handle index overflow: {what}")]
    HandleOverflow { what: &'static str },
}
