//! Mathematical utilities and decisions.

pub use ordered_float::NotNan;

mod aab;
pub use aab::*;
mod coord;
pub use coord::*;
mod matrix;
pub use matrix::*;
mod restricted_number;
pub use restricted_number::*;
mod rotation;
pub use rotation::*;

/// Returns `vector` with its component along the unit vector `normal` removed.
#[inline]
pub fn project_onto_plane<U>(
    vector: euclid::Vector3D<FreeCoordinate, U>,
    normal: euclid::Vector3D<FreeCoordinate, U>,
) -> euclid::Vector3D<FreeCoordinate, U> {
    vector - normal * vector.dot(normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_onto_plane_removes_normal_component() {
        let v = FreeVector::new(1.0, 2.0, -3.0);
        let n = FreeVector::new(0.0, 0.0, 1.0);
        assert_eq!(project_onto_plane(v, n), FreeVector::new(1.0, 2.0, 0.0));
    }
}
