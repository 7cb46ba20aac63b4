//! Real symmetric spherical harmonics
//!
//! Reference implementation of the basis used to describe orientation
//! distribution functions before they are turned into tensor distributions:
//!
//! ```text
//! S_l^m = 0                      if l is odd
//!       = sqrt2 Im(Y_l^{|m|})    if m < 0
//!       = Y_l^0                  if m = 0
//!       = sqrt2 Re(Y_l^m)        if m > 0
//! ```
//!
//! with `Y_l^m(theta, phi) = N_l^m P_l^m(cos theta) e^{i m phi}` and the
//! Condon-Shortley phase included in `P_l^m`.

use std::f64::consts::{PI, SQRT_2};

use nalgebra::{DMatrix, Vector3};

use crate::error::SimError;

/// Basis function of degree `l` and order `m` sampled at polar angles
/// `thetas` and azimuthal angles `phis`.
pub fn sh(l: u32, m: i32, thetas: &[f64], phis: &[f64]) -> Result<Vec<f64>, SimError> {
    if m.unsigned_abs() > l {
        return Err(SimError::value(
            "m",
            format!("order {m} exceeds degree {l}"),
        ));
    }
    if thetas.len() != phis.len() {
        return Err(SimError::shape(
            "phis",
            format!("({},)", thetas.len()),
            &[phis.len()],
        ));
    }
    if l % 2 == 1 {
        return Ok(vec![0.0; phis.len()]);
    }

    let order = m.unsigned_abs();
    let norm = normalization(l, order);
    Ok(thetas
        .iter()
        .zip(phis)
        .map(|(&theta, &phi)| {
            let radial = norm * assoc_legendre(l, order, theta.cos());
            match m {
                0 => radial,
                m if m < 0 => SQRT_2 * radial * (order as f64 * phi).sin(),
                _ => SQRT_2 * radial * (order as f64 * phi).cos(),
            }
        })
        .collect())
}

/// Number of even-degree coefficients up to and including `l_max`.
pub fn n_coeffs(l_max: u32) -> Result<usize, SimError> {
    if l_max % 2 == 1 {
        return Err(SimError::value(
            "l_max",
            format!("must be even, got {l_max}"),
        ));
    }
    let l = l_max as usize;
    Ok((l + 1) * (l + 2) / 2)
}

/// Basis matrix with one row per sample and one column per even `(l, m)`,
/// ordered by ascending `l` and then `m` from `-l` to `l`.
pub fn sh_matrix(l_max: u32, thetas: &[f64], phis: &[f64]) -> Result<DMatrix<f64>, SimError> {
    let cols = n_coeffs(l_max)?;
    let mut matrix = DMatrix::zeros(thetas.len(), cols);
    let mut col = 0;
    for l in (0..=l_max).step_by(2) {
        let degree = l as i32;
        for m in -degree..=degree {
            let values = sh(l, m, thetas, phis)?;
            matrix.set_column(col, &nalgebra::DVector::from_vec(values));
            col += 1;
        }
    }
    Ok(matrix)
}

/// Polar and azimuthal angles of each (non-zero) vector.
pub fn cartesian_to_spherical(vectors: &[Vector3<f64>]) -> (Vec<f64>, Vec<f64>) {
    vectors
        .iter()
        .map(|v| {
            let r = v.norm();
            let theta = if r > 0.0 {
                (v.z / r).clamp(-1.0, 1.0).acos()
            } else {
                0.0
            };
            (theta, v.y.atan2(v.x))
        })
        .unzip()
}

/// `sqrt((2l + 1) / 4pi * (l - m)! / (l + m)!)`
fn normalization(l: u32, m: u32) -> f64 {
    let ratio: f64 = ((l - m + 1)..=(l + m)).map(|k| 1.0 / k as f64).product();
    ((2 * l + 1) as f64 / (4.0 * PI) * ratio).sqrt()
}

/// Associated Legendre function `P_l^m(x)` with the Condon-Shortley phase, `m <= l`.
fn assoc_legendre(l: u32, m: u32, x: f64) -> f64 {
    let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
    let mut pmm = 1.0;
    let mut fact = 1.0;
    for _ in 0..m {
        pmm *= -fact * somx2;
        fact += 2.0;
    }
    if l == m {
        return pmm;
    }

    let mut pmmp1 = x * (2 * m + 1) as f64 * pmm;
    if l == m + 1 {
        return pmmp1;
    }

    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = (x * (2 * ll - 1) as f64 * pmmp1 - (ll + m - 1) as f64 * pmm) / (ll - m) as f64;
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}
