//! Measurement protocol
//!
//! A [`Protocol`] stores the b-values, b-vectors and encoding shape of an
//! acquisition and derives one b-tensor per measurement. All validation
//! happens in the constructors; the value is immutable afterwards.

use nalgebra::{Matrix3, Vector3};
use ndarray::{ArrayViewD, Ix1, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::rotation::vec2vec_rotmat;

/// Directions shorter than this are treated as the zero (b0) direction.
const ZERO_DIRECTION_TOL: f64 = 1e-9;

/// Canonical 48-direction scheme, version 1.
///
/// Spherical Fibonacci lattice on the upper hemisphere, identical to
/// `hemisphere_directions(48)`.
pub const VERTICES_48: [[f64; 3]; 48] = [
    [0.14396119751130454, 0.0, 0.9895833333333334],
    [-0.18289637586693194, 0.16754806234254682, 0.96875],
    [0.027846704963533343, -0.3172988403354628, 0.9479166666666666],
    [0.22807652942452578, 0.2974854446543879, 0.9270833333333334],
    [-0.416279910024372, -0.07363405469007381, 0.90625],
    [0.39217590565948707, -0.2494702094620719, 0.8854166666666666],
    [-0.13044842758063135, 0.485261648457781, 0.8645833333333334],
    [-0.24738556619418842, -0.47632585394746396, 0.84375],
    [0.5336867502471996, 0.19490154522939407, 0.8229166666666666],
    [-0.5520303770206937, 0.2278701148357977, 0.8020833333333334],
    [0.2645724100061607, -0.5653758726400799, 0.78125],
    [0.1943655717688171, 0.6196680704752637, 0.7604166666666666],
    [-0.5823433821409094, -0.33747989322660754, 0.7395833333333333],
    [0.6790520057591499, -0.1492876785755457, 0.71875],
    [-0.41189560591966096, 0.5858791139927794, 0.6979166666666667],
    [-0.09457183299355487, -0.7298043081035227, 0.6770833333333333],
    [0.5769609516521259, 0.48626330086556324, 0.65625],
    [-0.771510059127639, 0.031904363135612415, 0.6354166666666667],
    [0.5591614330595027, -0.5564403096179611, 0.6145833333333333],
    [-0.037167927314477406, 0.8037906958152388, 0.59375],
    [-0.5251339443935512, -0.6292859711619402, 0.5729166666666667],
    [0.8263427130821289, 0.11118324330411461, 0.5520833333333333],
    [-0.6954435837703357, 0.4838715318064001, 0.53125],
    [0.1887380040413726, -0.8389593507550694, 0.5104166666666667],
    [0.4335201018252923, 0.7565503823511097, 0.48958333333333337],
    [-0.8415429459820226, -0.26847515260801796, 0.46875],
    [0.8116336390582708, -0.3749953275325585, 0.44791666666666663],
    [-0.3490811668946689, 0.8341116024300016, 0.42708333333333337],
    [-0.3092648215849346, -0.8598349886053943, 0.40625],
    [0.8168020447879594, 0.4292882629256988, 0.38541666666666663],
    [-0.9004141992100434, 0.23734629324363096, 0.36458333333333337],
    [0.5078797356322526, -0.7898696801587672, 0.34375],
    [0.16030225082591046, 0.9327529226805114, 0.32291666666666663],
    [-0.7536864633453159, -0.5836971600858205, 0.30208333333333337],
    [0.9563580286188716, -0.07923230778050969, 0.28125],
    [-0.6556486155406371, 0.7087369417928405, 0.26041666666666663],
    [0.00473620126218022, -0.9708642514721061, 0.23958333333333337],
    [0.6556127379158925, 0.7227173551136206, 0.21875],
    [-0.9760359623060064, -0.09045879360760656, 0.19791666666666663],
    [0.7839705057049624, -0.5950056632001591, 0.17708333333333337],
    [-0.17678522429953264, 0.9717679362735548, 0.15625],
    [-0.5276996251341022, -0.8385674880546091, 0.13541666666666663],
    [0.9580850311642553, 0.2625713860671235, 0.11458333333333337],
    [-0.8857679188436979, 0.4545614715825619, 0.09375],
    [0.34669147556655305, -0.9351407276403421, 0.07291666666666663],
    [0.3765309104551378, 0.9249388087115351, 0.05208333333333337],
    [-0.9032145111191838, -0.4280502124794866, 0.03125],
    [0.9555609097627037, -0.2946096413714757, 0.01041666666666663],
];

/// Shape of the b-tensor of every measurement in a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingShape {
    /// Rank-1 tensor along the b-vector.
    #[default]
    Linear,
    /// Rank-2 tensor in the plane orthogonal to the b-vector.
    Planar,
    /// Isotropic tensor, direction ignored.
    Spherical,
}

impl EncodingShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingShape::Linear => "linear",
            EncodingShape::Planar => "planar",
            EncodingShape::Spherical => "spherical",
        }
    }

    /// b-tensor of a single measurement. `direction` must be unit length or zero.
    fn btensor(&self, bval: f64, direction: &Vector3<f64>) -> Matrix3<f64> {
        if bval == 0.0 {
            return Matrix3::zeros();
        }
        match self {
            EncodingShape::Linear => direction * direction.transpose() * bval,
            EncodingShape::Planar => {
                let r = vec2vec_rotmat(&Vector3::z(), direction);
                let planar = Matrix3::from_diagonal(&Vector3::new(0.5, 0.5, 0.0));
                bval * r * planar * r.transpose()
            }
            EncodingShape::Spherical => Matrix3::identity() * (bval / 3.0),
        }
    }
}

/// Diffusion-encoding protocol (one b-value, b-vector and b-tensor per measurement).
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    bvals: Vec<f64>,
    bvecs: Vec<Vector3<f64>>,
    btens: Vec<Matrix3<f64>>,
    shape: EncodingShape,
}

impl Protocol {
    /// Build a protocol from dynamically shaped arrays.
    ///
    /// `bvals` must be one-dimensional with length N and `bvecs` two-dimensional
    /// with shape (N, 3). Zero-dimensional inputs are rejected as type errors.
    pub fn new(
        bvals: ArrayViewD<'_, f64>,
        bvecs: ArrayViewD<'_, f64>,
        shape: EncodingShape,
    ) -> Result<Self, SimError> {
        if bvals.ndim() == 0 {
            return Err(SimError::Type {
                argument: "bvals",
                expected: "a one-dimensional array",
            });
        }
        if bvecs.ndim() == 0 {
            return Err(SimError::Type {
                argument: "bvecs",
                expected: "a two-dimensional array",
            });
        }
        let got_bvals = bvals.shape().to_vec();
        let bvals = bvals
            .into_dimensionality::<Ix1>()
            .map_err(|_| SimError::shape("bvals", "(N,)", &got_bvals))?;
        let got_bvecs = bvecs.shape().to_vec();
        let bvecs = bvecs
            .into_dimensionality::<Ix2>()
            .map_err(|_| SimError::shape("bvecs", "(N, 3)", &got_bvecs))?;
        if bvecs.ncols() != 3 {
            return Err(SimError::shape("bvecs", "(N, 3)", &got_bvecs));
        }
        if bvecs.nrows() != bvals.len() {
            return Err(SimError::shape(
                "bvecs",
                format!("({}, 3)", bvals.len()),
                &got_bvecs,
            ));
        }

        let values = bvals.to_vec();
        let directions: Vec<[f64; 3]> = bvecs
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        Self::from_directions(&values, &directions, shape)
    }

    /// Build a protocol from statically shaped slices.
    ///
    /// Non-zero directions are normalised to unit length.
    pub fn from_directions(
        bvals: &[f64],
        bvecs: &[[f64; 3]],
        shape: EncodingShape,
    ) -> Result<Self, SimError> {
        if bvals.len() != bvecs.len() {
            return Err(SimError::shape(
                "bvecs",
                format!("({}, 3)", bvals.len()),
                &[bvecs.len(), 3],
            ));
        }

        let mut unit_bvecs = Vec::with_capacity(bvecs.len());
        for (i, (&b, v)) in bvals.iter().zip(bvecs).enumerate() {
            if !b.is_finite() || b < 0.0 {
                return Err(SimError::value(
                    "bvals",
                    format!("entry {i} must be finite and >= 0, got {b}"),
                ));
            }
            let v = Vector3::from(*v);
            if v.iter().any(|x| !x.is_finite()) {
                return Err(SimError::value(
                    "bvecs",
                    format!("row {i} must be finite"),
                ));
            }
            let norm = v.norm();
            if norm < ZERO_DIRECTION_TOL {
                if b > 0.0 && shape != EncodingShape::Spherical {
                    return Err(SimError::value(
                        "bvecs",
                        format!("row {i} is zero but b-value {b} needs a direction"),
                    ));
                }
                unit_bvecs.push(Vector3::zeros());
            } else {
                unit_bvecs.push(v / norm);
            }
        }

        let btens = bvals
            .iter()
            .zip(&unit_bvecs)
            .map(|(&b, u)| shape.btensor(b, u))
            .collect();

        tracing::debug!(
            measurements = bvals.len(),
            shape = shape.as_str(),
            "built diffusion protocol"
        );

        Ok(Self {
            bvals: bvals.to_vec(),
            bvecs: unit_bvecs,
            btens,
            shape,
        })
    }

    /// One b0 measurement followed by every direction at each b-value, shell by shell.
    pub fn shells(
        b_values: &[f64],
        directions: &[[f64; 3]],
        shape: EncodingShape,
    ) -> Result<Self, SimError> {
        let mut bvals = Vec::with_capacity(1 + b_values.len() * directions.len());
        let mut bvecs = Vec::with_capacity(bvals.capacity());
        bvals.push(0.0);
        bvecs.push([0.0; 3]);
        for &b in b_values {
            for dir in directions {
                bvals.push(b);
                bvecs.push(*dir);
            }
        }
        Self::from_directions(&bvals, &bvecs, shape)
    }

    pub fn bvals(&self) -> &[f64] {
        &self.bvals
    }

    pub fn bvecs(&self) -> &[Vector3<f64>] {
        &self.bvecs
    }

    pub fn btens(&self) -> &[Matrix3<f64>] {
        &self.btens
    }

    pub fn shape(&self) -> EncodingShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }
}

/// `n` unit vectors on the upper hemisphere from a spherical Fibonacci lattice.
pub fn hemisphere_directions(n: usize) -> Vec<[f64; 3]> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let phi = i as f64 * golden_angle;
            [r * phi.cos(), r * phi.sin(), z]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    fn kind_of(result: Result<Protocol, SimError>) -> ErrorKind {
        result.expect_err("construction should fail").kind()
    }

    #[test]
    fn rejects_bvecs_with_two_columns() {
        let bvals = Array1::<f64>::zeros(3).into_dyn();
        let bvecs = Array2::<f64>::zeros((3, 2)).into_dyn();
        let kind = kind_of(Protocol::new(bvals.view(), bvecs.view(), EncodingShape::Linear));
        assert_eq!(kind, ErrorKind::Shape);
    }

    #[test]
    fn rejects_two_dimensional_bvals() {
        let bvals = Array2::<f64>::zeros((3, 3)).into_dyn();
        let bvecs = Array2::<f64>::zeros((3, 3)).into_dyn();
        let kind = kind_of(Protocol::new(bvals.view(), bvecs.view(), EncodingShape::Linear));
        assert_eq!(kind, ErrorKind::Shape);
    }

    #[test]
    fn rejects_length_mismatch() {
        let bvals = Array1::<f64>::zeros(3).into_dyn();
        let bvecs = Array2::<f64>::zeros((2, 3)).into_dyn();
        let kind = kind_of(Protocol::new(bvals.view(), bvecs.view(), EncodingShape::Linear));
        assert_eq!(kind, ErrorKind::Shape);
        assert_eq!(
            kind_of(Protocol::from_directions(&[0.0; 3], &[[0.0; 3]; 2], EncodingShape::Linear)),
            ErrorKind::Shape
        );
    }

    #[test]
    fn scalar_inputs_are_type_errors() {
        let scalar = ndarray::arr0(1.0).into_dyn();
        let bvecs = Array2::<f64>::zeros((1, 3)).into_dyn();
        let kind = kind_of(Protocol::new(scalar.view(), bvecs.view(), EncodingShape::Linear));
        assert_eq!(kind, ErrorKind::Type);
    }

    #[test]
    fn negative_bvals_are_value_errors() {
        let kind = kind_of(Protocol::from_directions(
            &[-1.0],
            &[[1.0, 0.0, 0.0]],
            EncodingShape::Linear,
        ));
        assert_eq!(kind, ErrorKind::Value);
    }

    #[test]
    fn weighted_measurement_needs_a_direction() {
        let kind = kind_of(Protocol::from_directions(&[1.0], &[[0.0; 3]], EncodingShape::Planar));
        assert_eq!(kind, ErrorKind::Value);
        assert!(Protocol::from_directions(&[1.0], &[[0.0; 3]], EncodingShape::Spherical).is_ok());
    }

    #[test]
    fn zero_bval_gives_zero_tensor() {
        for shape in [
            EncodingShape::Linear,
            EncodingShape::Planar,
            EncodingShape::Spherical,
        ] {
            let protocol =
                Protocol::from_directions(&[0.0, 0.0], &[[0.0; 3], [0.0, 1.0, 0.0]], shape)
                    .expect("b0 protocol");
            for bten in protocol.btens() {
                assert_eq!(*bten, Matrix3::zeros());
            }
        }
    }

    #[test]
    fn btensor_traces_match_bvals() {
        let dirs = hemisphere_directions(12);
        for shape in [
            EncodingShape::Linear,
            EncodingShape::Planar,
            EncodingShape::Spherical,
        ] {
            let protocol = Protocol::shells(&[0.5, 2.0], &dirs, shape).expect("protocol");
            assert_eq!(protocol.len(), 25);
            for (bten, &b) in protocol.btens().iter().zip(protocol.bvals()) {
                assert_relative_eq!(bten.trace(), b, epsilon = 1e-12);
                assert_relative_eq!(*bten, bten.transpose(), epsilon = 1e-12);
                let evals = bten.symmetric_eigenvalues();
                assert!(evals.iter().all(|&e| e > -1e-12));
            }
        }
    }

    #[test]
    fn planar_tensor_is_orthogonal_to_direction() {
        let u = Vector3::new(1.0, -2.0, 0.5).normalize();
        let protocol =
            Protocol::from_directions(&[3.0], &[[u.x, u.y, u.z]], EncodingShape::Planar)
                .expect("planar protocol");
        let expected = (Matrix3::identity() - u * u.transpose()) * 1.5;
        assert_relative_eq!(protocol.btens()[0], expected, epsilon = 1e-12);
        assert_relative_eq!(protocol.btens()[0] * u, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn linear_tensor_uses_normalised_direction() {
        let protocol =
            Protocol::from_directions(&[2.0], &[[0.0, 3.0, 0.0]], EncodingShape::Linear)
                .expect("linear protocol");
        assert_relative_eq!(protocol.bvecs()[0], Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(
            protocol.btens()[0],
            Matrix3::from_diagonal(&Vector3::new(0.0, 2.0, 0.0)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn canonical_scheme_matches_generator() {
        let generated = hemisphere_directions(48);
        for (table, gen) in VERTICES_48.iter().zip(&generated) {
            for axis in 0..3 {
                assert!((table[axis] - gen[axis]).abs() < 1e-12);
            }
            let norm = Vector3::from(*table).norm();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn encoding_shape_defaults_to_linear() {
        assert_eq!(EncodingShape::default(), EncodingShape::Linear);
    }
}
