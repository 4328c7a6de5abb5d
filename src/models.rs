//! Transform models produced by the landmark estimators.
//!
//! Each model maps a moving point onto the fixed frame and can be flattened to
//! an ordered parameter vector (and rebuilt from one):
//!
//! | model | parameters |
//! |---|---|
//! | [`RigidTransform`] | `[vx, vy, vz, tx, ty, tz]` |
//! | [`SimilarityTransform`] | `[vx, vy, vz, tx, ty, tz, s]` |
//! | [`AffineTransform`] | `[m00, m01, m02, m10, .., m22, tx, ty, tz]` |
//!
//! `v` is the vector part of the rotation's unit quaternion, stored with a
//! non-negative scalar part.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Quaternion, Rotation3, Translation3, UnitQuaternion,
    Vector3,
};
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// Transform family estimated by a registration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    /// Rotation and translation.
    Rigid,
    /// Rotation, translation and uniform scale.
    Similarity,
    /// General linear map plus translation.
    Affine,
}

impl TransformType {
    /// Theoretical minimum number of correspondences.
    pub fn minimal_sample_size(self) -> usize {
        match self {
            TransformType::Rigid | TransformType::Similarity => 3,
            TransformType::Affine => 4,
        }
    }

    /// Length of the flattened parameter vector.
    pub fn parameter_count(self) -> usize {
        match self {
            TransformType::Rigid => 6,
            TransformType::Similarity => 7,
            TransformType::Affine => 12,
        }
    }
}

/// Rigid transform in 3D (rotation + translation).
#[derive(Clone, Debug, PartialEq)]
pub struct RigidTransform {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Translation3<f64>,
}

impl RigidTransform {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Translation3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(UnitQuaternion::identity(), Translation3::identity())
    }

    /// Build from a rotation matrix that may have drifted from orthonormality.
    pub fn from_rt(r: Matrix3<f64>, t: Vector3<f64>) -> Self {
        Self::new(orthonormal_rotation(r), Translation3::from(t))
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation.transform_point(p) + self.translation.vector
    }

    pub fn to_matrix4(&self) -> Matrix4<f64> {
        Isometry3::from_parts(self.translation, self.rotation).to_homogeneous()
    }

    pub fn parameters(&self) -> Vec<f64> {
        let mut out = versor_parameters(&self.rotation).to_vec();
        out.extend_from_slice(self.translation.vector.as_slice());
        out
    }

    pub fn from_parameters(params: &[f64]) -> Result<Self, EstimationError> {
        check_len(params, TransformType::Rigid)?;
        Ok(Self::new(
            versor_from_parameters(&params[0..3])?,
            Translation3::new(params[3], params[4], params[5]),
        ))
    }
}

/// Similarity transform in 3D: `p' = s R p + t`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Translation3<f64>,
    pub scale: f64,
}

impl SimilarityTransform {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Translation3<f64>, scale: f64) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self::new(UnitQuaternion::identity(), Translation3::identity(), 1.0)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * (p.coords * self.scale) + self.translation.vector)
    }

    pub fn to_matrix4(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        let sr = self.rotation.to_rotation_matrix().into_inner() * self.scale;
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&sr);
        m.fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation.vector);
        m
    }

    pub fn parameters(&self) -> Vec<f64> {
        let mut out = versor_parameters(&self.rotation).to_vec();
        out.extend_from_slice(self.translation.vector.as_slice());
        out.push(self.scale);
        out
    }

    pub fn from_parameters(params: &[f64]) -> Result<Self, EstimationError> {
        check_len(params, TransformType::Similarity)?;
        let scale = params[6];
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EstimationError::InvalidSettings(format!(
                "similarity scale must be positive, got {scale}"
            )));
        }
        Ok(Self::new(
            versor_from_parameters(&params[0..3])?,
            Translation3::new(params[3], params[4], params[5]),
            scale,
        ))
    }
}

/// Affine transform in 3D: `p' = M p + t`.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineTransform {
    pub matrix: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl AffineTransform {
    pub fn new(matrix: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            matrix,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * p.coords + self.translation)
    }

    pub fn to_matrix4(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.matrix);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn parameters(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(12);
        for r in 0..3 {
            for c in 0..3 {
                out.push(self.matrix[(r, c)]);
            }
        }
        out.extend_from_slice(self.translation.as_slice());
        out
    }

    pub fn from_parameters(params: &[f64]) -> Result<Self, EstimationError> {
        check_len(params, TransformType::Affine)?;
        Ok(Self::new(
            Matrix3::from_row_slice(&params[0..9]),
            Vector3::new(params[9], params[10], params[11]),
        ))
    }
}

/// Any of the supported transform families.
#[derive(Clone, Debug, PartialEq)]
pub enum LandmarkTransform {
    Rigid(RigidTransform),
    Similarity(SimilarityTransform),
    Affine(AffineTransform),
}

impl LandmarkTransform {
    pub fn kind(&self) -> TransformType {
        match self {
            LandmarkTransform::Rigid(_) => TransformType::Rigid,
            LandmarkTransform::Similarity(_) => TransformType::Similarity,
            LandmarkTransform::Affine(_) => TransformType::Affine,
        }
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            LandmarkTransform::Rigid(t) => t.transform_point(p),
            LandmarkTransform::Similarity(t) => t.transform_point(p),
            LandmarkTransform::Affine(t) => t.transform_point(p),
        }
    }

    pub fn to_matrix4(&self) -> Matrix4<f64> {
        match self {
            LandmarkTransform::Rigid(t) => t.to_matrix4(),
            LandmarkTransform::Similarity(t) => t.to_matrix4(),
            LandmarkTransform::Affine(t) => t.to_matrix4(),
        }
    }

    pub fn parameters(&self) -> Vec<f64> {
        match self {
            LandmarkTransform::Rigid(t) => t.parameters(),
            LandmarkTransform::Similarity(t) => t.parameters(),
            LandmarkTransform::Affine(t) => t.parameters(),
        }
    }

    pub fn from_parameters(kind: TransformType, params: &[f64]) -> Result<Self, EstimationError> {
        Ok(match kind {
            TransformType::Rigid => LandmarkTransform::Rigid(RigidTransform::from_parameters(params)?),
            TransformType::Similarity => {
                LandmarkTransform::Similarity(SimilarityTransform::from_parameters(params)?)
            }
            TransformType::Affine => {
                LandmarkTransform::Affine(AffineTransform::from_parameters(params)?)
            }
        })
    }
}

/// Convert a (nearly) orthonormal matrix to a normalised unit quaternion,
/// removing accumulated drift.
pub(crate) fn orthonormal_rotation(r: Matrix3<f64>) -> UnitQuaternion<f64> {
    let rot = Rotation3::from_matrix_unchecked(r);
    UnitQuaternion::new_normalize(UnitQuaternion::from_rotation_matrix(&rot).into_inner())
}

fn versor_parameters(q: &UnitQuaternion<f64>) -> [f64; 3] {
    // q and -q encode the same rotation; keep w >= 0 so the vector part is unique.
    let sign = if q.w < 0.0 { -1.0 } else { 1.0 };
    [sign * q.i, sign * q.j, sign * q.k]
}

fn versor_from_parameters(v: &[f64]) -> Result<UnitQuaternion<f64>, EstimationError> {
    let norm_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    if !norm_sq.is_finite() || norm_sq > 1.0 + 1e-9 {
        return Err(EstimationError::InvalidSettings(format!(
            "versor vector part must have norm <= 1, got {}",
            norm_sq.sqrt()
        )));
    }
    let w = (1.0 - norm_sq).max(0.0).sqrt();
    Ok(UnitQuaternion::new_normalize(Quaternion::new(
        w, v[0], v[1], v[2],
    )))
}

fn check_len(params: &[f64], kind: TransformType) -> Result<(), EstimationError> {
    if params.len() != kind.parameter_count() {
        return Err(EstimationError::InvalidSettings(format!(
            "{kind:?} transform expects {} parameters, got {}",
            kind.parameter_count(),
            params.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_rotation() -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1)
    }

    #[test]
    fn rigid_parameters_rebuild_the_same_mapping() {
        let rigid = RigidTransform::new(sample_rotation(), Translation3::new(1.0, -2.0, 0.5));
        let params = rigid.parameters();
        assert_eq!(params.len(), 6);

        let rebuilt = RigidTransform::from_parameters(&params).unwrap();
        let p = Point3::new(0.7, 1.3, -4.0);
        assert_relative_eq!(
            rigid.transform_point(&p),
            rebuilt.transform_point(&p),
            epsilon = 1e-12
        );
    }

    #[test]
    fn negated_quaternion_gives_identical_parameters() {
        let q = sample_rotation();
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        let a = RigidTransform::new(q, Translation3::identity());
        let b = RigidTransform::new(flipped, Translation3::identity());
        for (x, y) in a.parameters().iter().zip(b.parameters()) {
            assert_relative_eq!(*x, y, epsilon = 1e-15);
        }
    }

    #[test]
    fn rigid_matrix_applies_rotation_before_translation() {
        let rigid = RigidTransform::new(sample_rotation(), Translation3::new(3.0, 0.0, -1.0));
        let p = Point3::new(1.0, 2.0, 3.0);
        let h = rigid.to_matrix4() * p.to_homogeneous();
        let expected = rigid.transform_point(&p);
        assert_relative_eq!(h.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(h.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(h.z, expected.z, epsilon = 1e-12);
    }

    #[test]
    fn similarity_scales_about_the_origin() {
        let sim = SimilarityTransform::new(
            UnitQuaternion::identity(),
            Translation3::new(1.0, 1.0, 1.0),
            2.0,
        );
        let p = sim.transform_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p, Point3::new(3.0, 5.0, 7.0), epsilon = 1e-12);
        assert_eq!(sim.parameters()[6], 2.0);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let mut params = SimilarityTransform::identity().parameters();
        params[6] = 0.0;
        assert!(SimilarityTransform::from_parameters(&params).is_err());
    }

    #[test]
    fn affine_parameters_are_row_major() {
        let affine = AffineTransform::new(
            Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0),
            Vector3::new(10.0, 11.0, 12.0),
        );
        let params = affine.parameters();
        assert_eq!(params[1], 2.0);
        assert_eq!(params[3], 4.0);
        assert_eq!(params[11], 12.0);
        assert_eq!(AffineTransform::from_parameters(&params).unwrap(), affine);
    }

    #[test]
    fn wrong_parameter_count_is_an_error() {
        let err = LandmarkTransform::from_parameters(TransformType::Rigid, &[0.0; 7]).unwrap_err();
        assert!(matches!(err, EstimationError::InvalidSettings(_)));
    }

    #[test]
    fn oversized_versor_is_rejected() {
        assert!(RigidTransform::from_parameters(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }
}
