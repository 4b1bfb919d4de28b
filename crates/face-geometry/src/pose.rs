//! Head pose estimation from facial landmarks
//!
//! The primary estimate solves a perspective-n-point problem between the
//! landmark positions and a fixed anthropometric face template, using a
//! synthetic pinhole camera (focal length 1.2x the frame dimension, principal
//! point at the image center, no lens distortion). The solve starts from a
//! direct linear transform and is refined with Levenberg-Marquardt on the
//! pixel reprojection error.
//!
//! When the correspondence is incomplete or the solve fails, a coarse pitch is
//! taken from the forehead-to-chin vector instead.

use nalgebra::{DMatrix, DVector, Matrix3, Matrix3x4, Rotation3, SVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::landmark::{FrameSize, LandmarkFrame};
use crate::layout::LandmarkLayout;
use crate::PoseError;

/// Focal length as a multiple of the frame dimension
const FOCAL_SCALE: f64 = 1.2;
/// Threshold below which the rotation decomposition is treated as gimbal-locked
const SINGULAR_EPS: f64 = 1e-6;
const MAX_ITERATIONS: usize = 50;
const JACOBIAN_STEP: f64 = 1e-6;
const MIN_STEP_NORM: f64 = 1e-10;

/// Head orientation (Euler angles, degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    /// Rotation about the camera x axis
    pub yaw: f64,
    /// Rotation about the camera y axis; negative is head-down
    pub pitch: f64,
    /// Rotation about the camera z axis
    pub roll: f64,
}

impl EulerAngles {
    /// Decompose a rotation matrix
    pub fn from_rotation(r: &Matrix3<f64>) -> Self {
        let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();
        let (yaw, pitch, roll) = if sy >= SINGULAR_EPS {
            (
                r[(2, 1)].atan2(r[(2, 2)]),
                (-r[(2, 0)]).atan2(sy),
                r[(1, 0)].atan2(r[(0, 0)]),
            )
        } else {
            ((-r[(1, 2)]).atan2(r[(1, 1)]), (-r[(2, 0)]).atan2(sy), 0.0)
        };

        Self {
            yaw: yaw.to_degrees(),
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }

    /// Downward tilt in degrees, zero when the head is level or raised
    pub fn pitch_down(&self) -> f64 {
        (-self.pitch).max(0.0)
    }
}

/// Pitch-down angle for one frame, `None` when neither method applies
pub fn pitch_down_deg(frame: &LandmarkFrame, size: FrameSize, layout: &LandmarkLayout) -> Option<f64> {
    match solve_head_pose(frame, size, layout) {
        Ok(angles) => Some(angles.pitch_down()),
        Err(e) => {
            trace!("Head pose solve unavailable ({}), using coarse pitch", e);
            coarse_pitch(frame, layout)
        }
    }
}

/// Coarse pitch from the forehead-to-chin vector: |atan2(dz, dy)| in degrees
pub fn coarse_pitch(frame: &LandmarkFrame, layout: &LandmarkLayout) -> Option<f64> {
    let top = frame.get(layout.pitch_axis.0)?;
    let bottom = frame.get(layout.pitch_axis.1)?;
    let dy = bottom.y - top.y;
    let dz = bottom.z - top.z;
    Some(dz.atan2(dy).to_degrees().abs())
}

/// Solve the head rotation against the layout's pose template
pub fn solve_head_pose(
    frame: &LandmarkFrame,
    size: FrameSize,
    layout: &LandmarkLayout,
) -> Result<EulerAngles, PoseError> {
    let missing = layout
        .pose_template
        .iter()
        .filter(|p| !frame.has(p.index))
        .count();
    if missing > 0 {
        return Err(PoseError::IncompleteCorrespondence { missing });
    }
    if size.width == 0 || size.height == 0 {
        return Err(PoseError::Degenerate);
    }

    let camera = Camera::synthetic(size);
    let mut model = Vec::with_capacity(layout.pose_template.len());
    let mut image = Vec::with_capacity(layout.pose_template.len());
    for point in &layout.pose_template {
        let lm = frame
            .get(point.index)
            .ok_or(PoseError::IncompleteCorrespondence { missing: 1 })?;
        model.push(Vector3::from(point.model));
        image.push(Vector2::new(
            lm.x * size.width as f64,
            lm.y * size.height as f64,
        ));
    }

    let (rotation, translation) = direct_linear_transform(&camera, &model, &image)?;
    let rotation = refine_pose(&camera, &model, &image, rotation, translation)?;
    Ok(EulerAngles::from_rotation(rotation.matrix()))
}

/// Pinhole intrinsics
#[derive(Debug, Clone, Copy)]
struct Camera {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

impl Camera {
    fn synthetic(size: FrameSize) -> Self {
        let w = size.width as f64;
        let h = size.height as f64;
        Self {
            fx: w * FOCAL_SCALE,
            fy: h * FOCAL_SCALE,
            cx: w / 2.0,
            cy: h / 2.0,
        }
    }

    /// Pixel position of a camera-space point, `None` behind the camera
    fn project(&self, p: &Vector3<f64>) -> Option<Vector2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        Some(Vector2::new(
            self.fx * p.x / p.z + self.cx,
            self.fy * p.y / p.z + self.cy,
        ))
    }

    /// Pixel to normalized image coordinates
    fn normalize(&self, px: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy)
    }
}

/// Initial [R|t] from the linear camera-matrix estimate
fn direct_linear_transform(
    camera: &Camera,
    model: &[Vector3<f64>],
    image: &[Vector2<f64>],
) -> Result<(Rotation3<f64>, Vector3<f64>), PoseError> {
    let n = model.len();
    if n < 6 {
        return Err(PoseError::Degenerate);
    }

    // Center and scale the template for conditioning
    let centroid = model.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n as f64;
    let spread = model.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n as f64;
    if spread <= f64::EPSILON {
        return Err(PoseError::Degenerate);
    }

    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (point, px)) in model.iter().zip(image).enumerate() {
        let uv = camera.normalize(px);
        let p = (point - centroid) / spread;
        let x = [p.x, p.y, p.z, 1.0];
        for (j, &xj) in x.iter().enumerate() {
            a[(2 * i, j)] = xj;
            a[(2 * i, 8 + j)] = -uv.x * xj;
            a[(2 * i + 1, 4 + j)] = xj;
            a[(2 * i + 1, 8 + j)] = -uv.y * xj;
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(PoseError::Degenerate)?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));
    let (smallest, next, largest) = match order.as_slice() {
        [s, n, .., l] => (*s, *n, *l),
        _ => return Err(PoseError::Degenerate),
    };
    if svd.singular_values[next] <= 1e-12 * svd.singular_values[largest] {
        return Err(PoseError::Degenerate);
    }

    let normalized = Matrix3x4::from_fn(|r, c| v_t[(smallest, r * 4 + c)]);

    // Undo the template normalization: P = P_n * [I/s, -c/s; 0, 1]
    let m_n = normalized.fixed_view::<3, 3>(0, 0).into_owned();
    let mut m = m_n / spread;
    let mut p4 = normalized.column(3).into_owned() - m_n * centroid / spread;

    let det = m.determinant();
    if !det.is_finite() || det.abs() <= f64::EPSILON * 1e-6 {
        return Err(PoseError::Degenerate);
    }
    if det < 0.0 {
        m = -m;
        p4 = -p4;
    }

    let svd = m.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(PoseError::Degenerate),
    };
    let rotation = u * v_t;
    let scale = svd.singular_values.mean();
    if rotation.determinant() <= 0.0 || scale <= 0.0 {
        return Err(PoseError::Degenerate);
    }

    Ok((Rotation3::from_matrix_unchecked(rotation), p4 / scale))
}

/// Levenberg-Marquardt refinement over (rotation vector, translation)
fn refine_pose(
    camera: &Camera,
    model: &[Vector3<f64>],
    image: &[Vector2<f64>],
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
) -> Result<Rotation3<f64>, PoseError> {
    let axis = rotation.scaled_axis();
    let mut params = SVector::<f64, 6>::new(
        axis.x,
        axis.y,
        axis.z,
        translation.x,
        translation.y,
        translation.z,
    );

    let mut cost = reprojection_residuals(camera, model, image, &params)
        .ok_or(PoseError::Degenerate)?
        .norm_squared();
    let mut lambda = 1e-3;

    for _ in 0..MAX_ITERATIONS {
        let residuals =
            reprojection_residuals(camera, model, image, &params).ok_or(PoseError::Degenerate)?;
        let jacobian = numeric_jacobian(camera, model, image, &params)?;

        let jtj = jacobian.transpose() * &jacobian;
        let jtr = jacobian.transpose() * &residuals;

        let mut damped = jtj.clone();
        for i in 0..6 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let step = damped.lu().solve(&(-jtr)).ok_or(PoseError::Degenerate)?;
        let step = SVector::<f64, 6>::from_iterator(step.iter().copied());
        let candidate = params + step;

        match reprojection_residuals(camera, model, image, &candidate).map(|r| r.norm_squared()) {
            Some(candidate_cost) if candidate_cost < cost => {
                params = candidate;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);
                if step.norm() < MIN_STEP_NORM {
                    break;
                }
            }
            _ => {
                lambda *= 10.0;
                if lambda > 1e12 {
                    break;
                }
            }
        }
    }

    if !cost.is_finite() || params.iter().any(|v| !v.is_finite()) {
        return Err(PoseError::NotConverged);
    }
    let (rotation, _) = pose_from_params(&params);
    Ok(rotation)
}

fn pose_from_params(params: &SVector<f64, 6>) -> (Rotation3<f64>, Vector3<f64>) {
    (
        Rotation3::new(Vector3::new(params[0], params[1], params[2])),
        Vector3::new(params[3], params[4], params[5]),
    )
}

/// Stacked (projected - observed) pixel residuals, `None` if any point falls
/// behind the camera
fn reprojection_residuals(
    camera: &Camera,
    model: &[Vector3<f64>],
    image: &[Vector2<f64>],
    params: &SVector<f64, 6>,
) -> Option<DVector<f64>> {
    let (rotation, translation) = pose_from_params(params);
    let mut residuals = DVector::zeros(2 * model.len());
    for (i, (point, observed)) in model.iter().zip(image).enumerate() {
        let projected = camera.project(&(rotation * point + translation))?;
        residuals[2 * i] = projected.x - observed.x;
        residuals[2 * i + 1] = projected.y - observed.y;
    }
    Some(residuals)
}

fn numeric_jacobian(
    camera: &Camera,
    model: &[Vector3<f64>],
    image: &[Vector2<f64>],
    params: &SVector<f64, 6>,
) -> Result<DMatrix<f64>, PoseError> {
    let mut jacobian = DMatrix::zeros(2 * model.len(), 6);
    for k in 0..6 {
        let mut forward = *params;
        let mut backward = *params;
        forward[k] += JACOBIAN_STEP;
        backward[k] -= JACOBIAN_STEP;
        let rf = reprojection_residuals(camera, model, image, &forward).ok_or(PoseError::Degenerate)?;
        let rb = reprojection_residuals(camera, model, image, &backward).ok_or(PoseError::Degenerate)?;
        jacobian.set_column(k, &((rf - rb) / (2.0 * JACOBIAN_STEP)));
    }
    Ok(jacobian)
}
