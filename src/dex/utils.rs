use std::borrow::Borrow;

/// Swap values in pair if condition is `true`, return unchanged otherwise
pub fn swap_if<T>(condition: bool, pair: (T, T)) -> (T, T) {
    if condition {
        (pair.1, pair.0)
    } else {
        pair
    }
}

/// Similar to `assert!`, but bails out with specified error instead of panicking
///
/// # Parameters
/// * cond - condition which should succeed
/// * error - expression which should resolve to error value
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error:expr) => {
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !($cond) {
            std::result::Result::Err($error)?;
        }
    };
}

pub trait PairExt<T>: Into<(T, T)> {
    fn as_refs(&self) -> (&T, &T);

    fn map<U, F>(self, f: F) -> (U, U)
    where
        F: Fn(T) -> U,
    {
        let (l, r) = self.into();
        (f(l), f(r))
    }

    fn map_into<U>(self) -> (U, U)
    where
        T: Into<U>,
    {
        self.map(Into::into)
    }

    fn cloned<U>(self) -> (U, U)
    where
        T: Borrow<U>,
        U: Clone,
    {
        let (l, r) = self.into();
        (U::clone(l.borrow()), U::clone(r.borrow()))
    }

    fn try_map<U, E, F>(self, f: F) -> Result<(U, U), E>
    where
        F: Fn(T) -> Result<U, E>,
    {
        let (l, r) = self.into();
        Ok((f(l)?, f(r)?))
    }
}

impl<T> PairExt<T> for (T, T) {
    fn as_refs(&self) -> (&T, &T) {
        (&self.0, &self.1)
    }
}
