#![allow(clippy::missing_inline_in_public_items)]

use core::fmt;

use manyfmt::Fmt;

/// Format type for [`manyfmt::Fmt`] which is similar to [`fmt::Debug`], but uses an
/// alternate concise format.
///
/// This format may be on one line despite the pretty-printing option, and may lose
/// precision or Rust syntax in favor of a short at-a-glance representation.
/// It is used for per-tick diagnostic logging, where full-precision `Debug` output of
/// vectors buries the interesting information.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ConciseDebug;

impl<T: fmt::Debug, U> Fmt<ConciseDebug> for euclid::Point3D<T, U> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        write!(fmt, "({:+.3?}, {:+.3?}, {:+.3?})", self.x, self.y, self.z)
    }
}
impl<T: fmt::Debug, U> Fmt<ConciseDebug> for euclid::Vector3D<T, U> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        write!(fmt, "({:+.3?}, {:+.3?}, {:+.3?})", self.x, self.y, self.z)
    }
}
impl<T: fmt::Debug, Src, Dst> Fmt<ConciseDebug> for euclid::Rotation3D<T, Src, Dst> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        write!(
            fmt,
            "[{:+.3?}i {:+.3?}j {:+.3?}k {:+.3?}]",
            self.i, self.j, self.k, self.r
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FreePoint, FreeVector, Rotation};
    use manyfmt::Refmt as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn vector_and_point() {
        assert_eq!(
            format!("{:?}", FreeVector::new(1.0, -0.5, 1.0 / 3.0).refmt(&ConciseDebug)),
            "(+1.000, -0.500, +0.333)"
        );
        assert_eq!(
            format!("{}", FreePoint::new(0.0, 2.0, -3.0).refmt(&ConciseDebug)),
            "(+0.000, +2.000, -3.000)"
        );
    }

    #[test]
    fn rotation() {
        assert_eq!(
            format!("{:?}", Rotation::identity().refmt(&ConciseDebug)),
            "[+0.000i +0.000j +0.000k +1.000]"
        );
    }
}
