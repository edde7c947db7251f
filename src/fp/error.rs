/// Math-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Attempted convert negative value to unsigned")]
    NegativeToUnsigned,
    #[error("Numeric overflow")]
    Overflow,
    #[error("Precision loss")]
    PrecisionLoss,
    #[error("Malformed decimal literal")]
    BadDecimal,
}
