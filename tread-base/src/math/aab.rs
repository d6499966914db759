use core::fmt;

use euclid::{Point3D, Vector3D};

use crate::math::{FreeCoordinate, FreePoint, FreeVector};

/// Axis-Aligned Box data type, in world coordinates.
///
/// Used for collision query regions and body bounds.
#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aab {
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The [`Aab`] of zero size at the origin.
    pub const ZERO: Aab = Aab {
        lower_bounds: Point3D::new(0., 0., 0.),
        upper_bounds: Point3D::new(0., 0., 0.),
    };

    /// Constructs an [`Aab`] from individual coordinates.
    #[inline]
    #[track_caller]
    pub fn new(
        lx: FreeCoordinate,
        hx: FreeCoordinate,
        ly: FreeCoordinate,
        hy: FreeCoordinate,
        lz: FreeCoordinate,
        hz: FreeCoordinate,
    ) -> Self {
        Self::from_lower_upper(Point3D::new(lx, ly, lz), Point3D::new(hx, hy, hz))
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(aab) => aab,
            None => panic!(
                "invalid AAB points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    #[inline]
    pub fn checked_from_lower_upper(
        lower_bounds: FreePoint,
        upper_bounds: FreePoint,
    ) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x
            && lower_bounds.y <= upper_bounds.y
            && lower_bounds.z <= upper_bounds.z
        {
            Some(Self {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// Constructs the smallest [`Aab`] containing all of the given points,
    /// or [`None`] if there are none or any is NaN.
    #[inline]
    pub fn from_points(points: impl IntoIterator<Item = FreePoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (lower, upper) = points.fold((first, first), |(lower, upper), p| {
            (lower.min(p), upper.max(p))
        });
        Self::checked_from_lower_upper(lower, upper)
    }

    /// Size of the box in each axis, as a vector.
    #[inline]
    pub fn size(&self) -> FreeVector {
        self.upper_bounds - self.lower_bounds
    }

    /// The center of the enclosed volume.
    ///
    /// ```
    /// use tread_base::math::{Aab, FreePoint};
    ///
    /// let aab = Aab::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
    /// assert_eq!(aab.center(), FreePoint::new(1.5, 3.5, 5.5));
    /// ```
    #[inline]
    pub fn center(&self) -> FreePoint {
        self.lower_bounds.lerp(self.upper_bounds, 0.5)
    }

    /// Returns whether this AAB, including the boundary, contains the point.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        self.lower_bounds.x <= point.x
            && point.x <= self.upper_bounds.x
            && self.lower_bounds.y <= point.y
            && point.y <= self.upper_bounds.y
            && self.lower_bounds.z <= point.z
            && point.z <= self.upper_bounds.z
    }

    /// Returns whether this AAB, including the boundary, entirely contains the other AAB.
    #[inline]
    pub fn contains_aab(&self, other: Aab) -> bool {
        self.contains(other.lower_bounds) && self.contains(other.upper_bounds)
    }

    /// Returns whether this AAB, including the boundary, intersects the other AAB.
    #[inline]
    pub fn intersects(&self, other: Aab) -> bool {
        self.lower_bounds.x <= other.upper_bounds.x
            && other.lower_bounds.x <= self.upper_bounds.x
            && self.lower_bounds.y <= other.upper_bounds.y
            && other.lower_bounds.y <= self.upper_bounds.y
            && self.lower_bounds.z <= other.upper_bounds.z
            && other.lower_bounds.z <= self.upper_bounds.z
    }

    /// Returns the smallest [`Aab`] containing both inputs.
    #[inline]
    #[must_use]
    pub fn union(self, other: Aab) -> Self {
        Self {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Translate this box by the specified offset.
    ///
    /// Note that due to rounding error, the result may not have the same size.
    #[inline]
    #[must_use]
    #[track_caller] // in case of NaN
    pub fn translate(self, offset: FreeVector) -> Self {
        Self::from_lower_upper(self.lower_bounds + offset, self.upper_bounds + offset)
    }

    /// Returns the box covering every position of `self` as it is translated from zero
    /// offset to `delta`.
    #[inline]
    #[must_use]
    pub fn swept(self, delta: FreeVector) -> Self {
        self.union(self.translate(delta))
    }

    /// Enlarges the AAB by moving each face outward by the specified distance (or inward
    /// if negative).
    ///
    /// If this would result in a negative or NaN size, produces a zero size AAB located
    /// at the center point of `self`.
    ///
    /// ```
    /// use tread_base::math::Aab;
    ///
    /// assert_eq!(
    ///     Aab::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0).expand(0.25),
    ///     Aab::new(0.75, 2.25, 2.75, 4.25, 4.75, 6.25)
    /// );
    /// ````
    #[must_use]
    #[inline]
    pub fn expand(self, distance: FreeCoordinate) -> Self {
        let distance_vec = Vector3D::splat(distance);
        match Self::checked_from_lower_upper(
            self.lower_bounds - distance_vec,
            self.upper_bounds + distance_vec,
        ) {
            Some(aab) => aab,
            None => {
                let center = self.center();
                Aab::from_lower_upper(center, center)
            }
        }
    }
}

impl fmt::Debug for Aab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Aab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Aab")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .field(&(l.z..=u.z))
            .finish()
    }
}

/// [`Aab`] rejects NaN values, so it can implement [`Eq`]
/// even though it contains floats.
impl Eq for Aab {}
