//! Defines the Denavit-Hartenberg parameter table of a serial revolute robot

use crate::matrix_literal::render_matrix;
use nalgebra::DMatrix;

/// One row of the kinematic table, standard DH convention. The joint transform is
/// `Rz(q + theta) * Tz(d) * Tx(a) * Rx(alpha)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhRow {
    /// Twist angle between consecutive joint axes (radians).
    pub alpha: f64,

    /// Link length, the common normal between consecutive joint axes.
    pub a: f64,

    /// Joint angle offset (radians), added to the commanded joint value.
    pub theta: f64,

    /// Link offset along the previous joint axis.
    pub d: f64,
}

/// Kinematic parameters of a six axis robot, as read from the robot descriptor file.
/// Rows are stored in the file order `[alpha, a, theta, d]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicTable {
    pub rows: [DhRow; 6],
}

impl KinematicTable {
    /// Number of rows (joints) every table must have.
    pub const ROWS: usize = 6;

    /// Number of columns (parameters per joint).
    pub const COLUMNS: usize = 4;

    /// Build from the raw matrix read from the descriptor. Returns None if the shape is not 6x4
    /// or any value is not finite.
    pub fn from_matrix(m: &DMatrix<f64>) -> Option<Self> {
        if m.shape() != (Self::ROWS, Self::COLUMNS) || m.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let rows = std::array::from_fn(|i| DhRow {
            alpha: m[(i, 0)],
            a: m[(i, 1)],
            theta: m[(i, 2)],
            d: m[(i, 3)],
        });
        Some(KinematicTable { rows })
    }

    /// The table as a 6x4 matrix, in the column order of the descriptor file.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(Self::ROWS, Self::COLUMNS, |i, j| {
            let row = &self.rows[i];
            match j {
                0 => row.alpha,
                1 => row.a,
                2 => row.theta,
                _ => row.d,
            }
        })
    }

    /// Convert to string representation in the descriptor dialect (quick viewing, etc).
    pub fn to_matlab(&self) -> String {
        format!(
            "% alpha a theta d\n{}",
            render_matrix("DH", &self.to_matrix())
        )
    }
}
