/// Affine transforms applied to parsed STL geometry
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// Composite of scale, rotation about a center, and translation.
///
/// Reduced to a single homogeneous matrix with [`AffineTransform::to_matrix4x4`]
/// before parsing starts; the parser never looks at the individual parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub scale: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub translation: Vector3<f32>,
    pub rotation_center: Vector3<f32>,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            rotation_center: Vector3::zeros(),
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(self, factor: f32) -> Self {
        self.with_scale(Vector3::new(factor, factor, factor))
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotation from Euler angles in radians (roll about X, pitch about Y, yaw about Z)
    pub fn with_rotation_euler(self, roll: f32, pitch: f32, yaw: f32) -> Self {
        self.with_rotation(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    pub fn with_translation(mut self, translation: Vector3<f32>) -> Self {
        self.translation = translation;
        self
    }

    /// Point the rotation pivots around. Scale is still applied about the origin.
    pub fn with_rotation_center(mut self, center: Vector3<f32>) -> Self {
        self.rotation_center = center;
        self
    }

    /// Collapse into one matrix: `T * C * R * C^-1 * S`
    pub fn to_matrix4x4(&self) -> Matrix4<f32> {
        let translate = Matrix4::new_translation(&self.translation);
        let to_center = Matrix4::new_translation(&self.rotation_center);
        let from_center = Matrix4::new_translation(&-self.rotation_center);
        let rotate = self.rotation.to_homogeneous();
        let scale = Matrix4::new_nonuniform_scaling(&self.scale);

        translate * to_center * rotate * from_center * scale
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// How the parser transforms geometry.
///
/// The composed and explicit forms are mutually exclusive; the parser
/// rejects any attempt to mix them when the second one is configured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransformConfig {
    #[default]
    Identity,
    /// Built up from the parser's `scale`/`rotation`/`translate` setters.
    Composed {
        scale: f32,
        rotation: UnitQuaternion<f32>,
        translation: Vector3<f32>,
    },
    Explicit(AffineTransform),
}

impl TransformConfig {
    /// Starting point for the composed setters.
    pub fn composed() -> Self {
        TransformConfig::Composed {
            scale: 1.0,
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self, TransformConfig::Composed { .. })
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, TransformConfig::Explicit(_))
    }

    pub fn to_affine(&self) -> AffineTransform {
        match *self {
            TransformConfig::Identity => AffineTransform::identity(),
            TransformConfig::Composed {
                scale,
                rotation,
                translation,
            } => AffineTransform::identity()
                .with_uniform_scale(scale)
                .with_rotation(rotation)
                .with_translation(translation),
            TransformConfig::Explicit(transform) => transform,
        }
    }

    pub fn to_matrix4x4(&self) -> Matrix4<f32> {
        match self {
            TransformConfig::Identity => Matrix4::identity(),
            _ => self.to_affine().to_matrix4x4(),
        }
    }
}

/// Transform a position, including translation and the divide by W
#[inline]
pub fn transform_coordinate(matrix: &Matrix4<f32>, v: &Vector3<f32>) -> Vector3<f32> {
    matrix.transform_point(&Point3::from(*v)).coords
}

/// Transform a direction by the upper 3x3 block only (no translation)
#[inline]
pub fn transform_normal(matrix: &Matrix4<f32>, n: &Vector3<f32>) -> Vector3<f32> {
    matrix.transform_vector(n)
}
