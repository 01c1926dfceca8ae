// stride_core/src/estimation/lie.rs

//! Matrix Lie group helpers for SO(3) and SE_K(3).

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

/// Below this rotation angle the exponential maps fall back to first order.
const TOLERANCE: f64 = 1e-10;

/// The skew-symmetric matrix `[v]x` such that `[v]x * w = v.cross(w)`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Returns `(R, J_l)`: the SO(3) exponential of `w` and its left Jacobian.
fn so3_exp_and_left_jacobian(w: &Vector3<f64>) -> (Matrix3<f64>, Matrix3<f64>) {
    let theta = w.norm();
    let identity = Matrix3::identity();
    if theta < TOLERANCE {
        return (identity, identity);
    }

    let a = skew(w);
    let a2 = a * a;
    let theta2 = theta * theta;
    let (s, c) = theta.sin_cos();
    let one_minus_cos_over_theta2 = (1.0 - c) / theta2;

    let rotation = identity + a * (s / theta) + a2 * one_minus_cos_over_theta2;
    let left_jacobian =
        identity + a * one_minus_cos_over_theta2 + a2 * ((theta - s) / (theta2 * theta));
    (rotation, left_jacobian)
}

/// The SO(3) exponential map (Rodrigues' formula).
pub fn exp_so3(w: &Vector3<f64>) -> Matrix3<f64> {
    so3_exp_and_left_jacobian(w).0
}

/// The SE_K(3) exponential map of a tangent vector `[w; v_1; ..; v_K]`.
///
/// The result is a `(3 + K) x (3 + K)` matrix with the rotation in the top-left
/// block and `J_l(w) * v_i` in column `3 + i - 1`.
pub fn exp_sek3(v: &DVector<f64>) -> DMatrix<f64> {
    let k = (v.len() - 3) / 3;
    let mut x = DMatrix::identity(3 + k, 3 + k);

    let w = Vector3::new(v[0], v[1], v[2]);
    let (rotation, left_jacobian) = so3_exp_and_left_jacobian(&w);

    x.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    for i in 0..k {
        let column = left_jacobian * v.fixed_rows::<3>(3 + 3 * i);
        x.fixed_view_mut::<3, 1>(0, 3 + i).copy_from(&column);
    }
    x
}

/// The adjoint representation of an SE_K(3) element.
pub fn adjoint_sek3(x: &DMatrix<f64>) -> DMatrix<f64> {
    let k = x.ncols() - 3;
    let dim = 3 + 3 * k;
    let rotation: Matrix3<f64> = x.fixed_view::<3, 3>(0, 0).into_owned();

    let mut adj = DMatrix::zeros(dim, dim);
    adj.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    for i in 0..k {
        let column: Vector3<f64> = x.fixed_view::<3, 1>(0, 3 + i).into_owned();
        adj.fixed_view_mut::<3, 3>(3 + 3 * i, 3 + 3 * i).copy_from(&rotation);
        adj.fixed_view_mut::<3, 3>(3 + 3 * i, 0).copy_from(&(skew(&column) * rotation));
    }
    adj
}
