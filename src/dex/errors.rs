use std::convert::Infallible;

use strum::EnumCount as _;
use thiserror::Error;

/// Creates error object with location info filled from macro invocation location
///
/// # Arguments
/// * `$kind` - expression which should produce `ErrorKind` value
#[macro_export]
macro_rules! error_here {
    ($kind:expr) => {{
        // Use `Location::caller()` instead of `file!()`+`line!()`+`column!()` macros
        // 'cause `caller` is subject to `#[track_caller]` attribute,
        // while macros are not, or at least not guaranteed
        let loc = std::panic::Location::caller();
        $crate::dex::Error {
            kind: ($kind).into(),
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }};
}

#[macro_export]
macro_rules! ensure_here {
    ($cond:expr, $err:expr) => {
        $crate::ensure!($cond, $crate::error_here!($err))
    };
}

// The discriminant doubles as a one-byte transport code.
static_assertions::const_assert!(ErrorKindDiscriminants::COUNT <= 256);

/// Error object which contains both error kind and its spawn location
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl Error {
    /// Stable static name for transport-level mapping; never leaks
    /// authorization material.
    pub fn name(&self) -> &'static str {
        ErrorKindDiscriminants::from(&self.kind).into()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Error {} at \"{}\":{}: {}",
            self.name(),
            self.file,
            self.line,
            self.kind
        ))
    }
}

impl std::error::Error for Error {}

#[derive(Error, strum_macros::EnumDiscriminants)]
#[strum_discriminants(
    vis(pub(crate)),
    derive(strum_macros::IntoStaticStr, strum_macros::EnumCount)
)]
pub enum ErrorKind {
    // Input validation
    #[error("Invalid params")]
    InvalidParams,
    #[error("Token keys must be supplied in canonical order")]
    TokenOrderInvalid,
    #[error("Token duplicated")]
    TokenDuplicates,
    #[error("Fee tier is not one of the supported tiers")]
    InvalidFeeTier,
    #[error("Tick value is either too large or too small")]
    TickOutOfRange,
    #[error("Tick is not a multiple of the pool tick spacing")]
    TickMisaligned,
    #[error("Lower tick must be strictly below upper tick")]
    TickRangeInvalid,
    #[error("Square-root price is outside the representable range")]
    SqrtPriceOutOfRange,
    #[error("Amount must not be negative")]
    NegativeAmount,
    // Not found
    #[error("Liquidity pool not registered")]
    PoolNotFound,
    #[error("Position does not exist")]
    PositionNotFound,
    #[error("Commitment not found")]
    CommitmentNotFound,
    #[error("Configuration singleton not present")]
    NotConfigured,
    // Authorization
    #[error("Permission denied")]
    Unauthorized,
    #[error("Mutating API is paused")]
    ContractPaused,
    // State conflicts
    #[error("Pool already exists")]
    PoolAlreadyExists,
    #[error("Position id already used for this owner and range")]
    DuplicatePositionId,
    #[error("Commitment already exists")]
    DuplicateCommitment,
    #[error("Commitment expired")]
    CommitmentExpired,
    #[error("Concurrent write detected on commit")]
    WriteConflict,
    // Liquidity and amounts
    #[error("Insufficient liquidity: at most {max_fraction_pct}% of the requested amount can be satisfied")]
    InsufficientLiquidity { max_fraction_pct: String },
    #[error("Insufficient liquidity in the pool to perform the swap")]
    InsufficientPoolLiquidity,
    #[error("Tick liquidity would exceed the per-tick maximum")]
    LiquidityExceedsMax,
    #[error("Slippage tolerance exceeded, amount received would be {actual}")]
    SlippageToleranceExceeded { actual: String },
    #[error("Limit order bought {bought}, which is below the required minimum {minimum}")]
    LimitOrderMinimumNotMet { bought: String, minimum: String },
    // Token subledger
    #[error("Not enough tokens in balance")]
    NotEnoughTokens,
    #[error("No sufficient transfer allowance")]
    AllowanceMissing,
    // Numeric conversions
    #[error("Numeric conversion error: overflow - source number cannot fit into destination")]
    ConvOverflow,
    #[error("Numeric conversion error: attempt to convert negative number to unsigned")]
    ConvNegativeToUnsigned,
    #[error("Numeric conversion error: loss of precision, lower digits of source number truncated")]
    ConvPrecisionLoss,
    #[error("Malformed decimal literal")]
    BadDecimalLiteral,
    // Storage and internal logic
    #[error("Malformed stored object: {0}")]
    StoredObjectCorrupt(String),
    #[error("Tick not found")]
    InternalTickNotFound,
    #[error("Internal logic error")]
    InternalLogicError,
}

// Custom debug implementation to not use `derive`, because it blows up binary size
impl std::fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// We need this stub conversion - sometimes we get
/// infallible conversions where we don't expect them
impl From<Infallible> for ErrorKind {
    fn from(i: Infallible) -> Self {
        match i {}
    }
}

impl From<crate::fp::Error> for ErrorKind {
    fn from(err: crate::fp::Error) -> Self {
        match err {
            crate::fp::Error::NegativeToUnsigned => Self::ConvNegativeToUnsigned,
            crate::fp::Error::Overflow => Self::ConvOverflow,
            crate::fp::Error::PrecisionLoss => Self::ConvPrecisionLoss,
            crate::fp::Error::BadDecimal => Self::BadDecimalLiteral,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_here_captures_location() {
        let error = error_here!(ErrorKind::PoolNotFound);
        assert!(error.file.ends_with("errors.rs"));
        assert_eq!(error.name(), "PoolNotFound");
        assert!(error.to_string().contains("not registered"));
    }

    #[test]
    fn fp_errors_bridge() {
        let kind: ErrorKind = crate::fp::Error::Overflow.into();
        assert!(matches!(kind, ErrorKind::ConvOverflow));
    }
}
