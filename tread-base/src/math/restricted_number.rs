use core::fmt;

/// A floating-point number which is not NaN and whose sign bit is positive.
///
/// The allowed values consist of positive zero, positive infinity,
/// and every value in between those.
/// Durations and other magnitudes that must never be negative use this type.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct PositiveSign(f64);

/// A floating-point number which is within the range +0 to +1 (inclusive).
///
/// Used for suspension extension, tire slip, and anything else where values outside the
/// range 0 to 1 are meaningless.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct ZeroOne(f64);

impl PositiveSign {
    /// Wraps the given value in `PositiveSign`.
    ///
    /// * If the value is NaN, returns zero.
    /// * If the value has a negative sign, it is replaced with positive zero.
    #[inline]
    pub const fn new_clamped(value: f64) -> Self {
        if value > 0. { Self(value) } else { Self(0.) }
    }

    /// Unwraps the value without modifying it.
    #[inline]
    pub const fn into_inner(self) -> f64 {
        self.0
    }
}

impl ZeroOne {
    /// The number zero.
    pub const ZERO: Self = Self(0.0);
    /// The number one.
    pub const ONE: Self = Self(1.0);

    /// Wraps the given value in `ZeroOne`, clamping out-of-range values to the nearest
    /// endpoint and NaN to zero.
    #[inline]
    pub const fn new_clamped(value: f64) -> Self {
        if value >= 1. {
            Self(1.)
        } else if value > 0. {
            Self(value)
        } else {
            Self(0.)
        }
    }

    /// Unwraps the value without modifying it.
    #[inline]
    pub const fn into_inner(self) -> f64 {
        self.0
    }

    /// Returns whether the value is exactly one.
    #[inline]
    pub const fn is_one(self) -> bool {
        self.0 == 1.
    }
}

impl fmt::Debug for PositiveSign {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl fmt::Debug for ZeroOne {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
