/// Scalar types a [`TriangleMesh`](crate::mesh::TriangleMesh) can be built over
use nalgebra::RealField;

/// Flat numeric capability needed by the mesh builder.
///
/// Arithmetic, comparison and the zero/one constants come from
/// [`RealField`]; the only addition is the conversion from the parser's
/// native `f32` storage.
pub trait Scalar: RealField + Copy + Send + Sync {
    /// Convert an `f32` coordinate with an `as`-style numeric cast.
    fn cast_from_f32(value: f32) -> Self;
}

impl Scalar for f32 {
    #[inline]
    fn cast_from_f32(value: f32) -> Self {
        value
    }
}

impl Scalar for f64 {
    #[inline]
    fn cast_from_f32(value: f32) -> Self {
        value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_from_f32() {
        assert_eq!(f32::cast_from_f32(1.5), 1.5f32);
        assert_eq!(f64::cast_from_f32(0.1), 0.1f32 as f64);
    }
}
