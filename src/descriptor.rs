//! Loads robot and tool descriptors from files of the matrix literal dialect
//! (see [`crate::matrix_literal`]).

use std::path::Path;

use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion};
use tracing::debug;

use crate::descriptor_error::{DescriptorError, DescriptorKind};
use crate::kinematic_traits::{Pose, Transform};
use crate::matrix_literal::extract_matrix;
use crate::parameters::KinematicTable;

/// Names under which robot files store the kinematic table, in priority order.
pub const ROBOT_MATRIX_NAMES: [&str; 3] = ["DH", "dh", "DH_table"];

/// Names under which tool files store the flange to TCP transform, in priority order.
pub const TOOL_MATRIX_NAMES: [&str; 4] = ["T_TCP", "TCP", "tcp", "tool"];

/// How far the tool rotation may deviate from orthonormal.
const RIGID_TOLERANCE: f64 = 1e-6;

/// Robot as described by its descriptor file.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotDescriptor {
    /// Base name of the file, case preserved.
    pub name: String,
    pub table: KinematicTable,
}

/// Tool as described by its descriptor file.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Base name of the file, case preserved.
    pub name: String,

    /// Transformation from the robot flange to the tool center point.
    pub transform: Transform,
}

impl ToolDescriptor {
    /// The tool transform as an isometry. The matrix was validated rigid on load.
    pub fn isometry(&self) -> Pose {
        let rotation = Rotation3::from_matrix_unchecked(self.transform.fixed_view::<3, 3>(0, 0).into_owned());
        let translation = Translation3::new(self.transform[(0, 3)], self.transform[(1, 3)], self.transform[(2, 3)]);
        Pose::from_parts(translation, UnitQuaternion::from_rotation_matrix(&rotation))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse the kinematic table from the descriptor text.
pub fn robot_from_str(name: &str, text: &str) -> Result<RobotDescriptor, DescriptorError> {
    let shape = (KinematicTable::ROWS, KinematicTable::COLUMNS);
    let parsed = extract_matrix(text, &ROBOT_MATRIX_NAMES, shape)?;
    let table = KinematicTable::from_matrix(&parsed.value).ok_or_else(|| {
        DescriptorError::InvalidMatrix(format!("{} is not a finite 6x4 table", parsed.name))
    })?;
    debug!("Robot {}: kinematic table taken from '{}'", name, parsed.name);
    Ok(RobotDescriptor { name: name.to_string(), table })
}

/// Parse the tool transform from the descriptor text.
pub fn tool_from_str(name: &str, text: &str) -> Result<ToolDescriptor, DescriptorError> {
    let parsed = extract_matrix(text, &TOOL_MATRIX_NAMES, (4, 4))?;
    let transform = Transform::from_fn(|i, j| parsed.value[(i, j)]);
    check_rigid(&transform)
        .map_err(|e| DescriptorError::InvalidMatrix(format!("{}: {}", parsed.name, e)))?;
    debug!("Tool {}: TCP transform taken from '{}'", name, parsed.name);
    Ok(ToolDescriptor { name: name.to_string(), transform })
}

/// Read the robot descriptor. A file that cannot be read or has no usable kinematic
/// table is reported with the file name.
pub fn load_robot<P: AsRef<Path>>(path: P) -> Result<RobotDescriptor, DescriptorError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        DescriptorError::from(e).in_file(path, DescriptorKind::Robot)
    })?;
    robot_from_str(&file_stem(path), &text).map_err(|e| e.in_file(path, DescriptorKind::Robot))
}

/// Read the tool descriptor. A file that cannot be read or has no usable rigid
/// 4x4 transform is reported with the file name.
pub fn load_tool<P: AsRef<Path>>(path: P) -> Result<ToolDescriptor, DescriptorError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        DescriptorError::from(e).in_file(path, DescriptorKind::Tool)
    })?;
    tool_from_str(&file_stem(path), &text).map_err(|e| e.in_file(path, DescriptorKind::Tool))
}

/// Homogeneous transform must have finite entries, bottom row [0 0 0 1] and a proper
/// rotation (orthonormal, determinant +1) in the top-left corner.
pub fn check_rigid(m: &Transform) -> Result<(), String> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err("contains non-finite values".to_string());
    }
    let bottom = [m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)]];
    if bottom != [0.0, 0.0, 0.0, 1.0] {
        return Err(format!("last row must be [0 0 0 1], found {:?}", bottom));
    }
    let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let deviation = (r.transpose() * r - Matrix3::identity()).amax();
    if deviation > RIGID_TOLERANCE {
        return Err(format!("rotation is not orthonormal (deviation {:e})", deviation));
    }
    if (r.determinant() - 1.0).abs() > RIGID_TOLERANCE {
        return Err("rotation is a reflection".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const ROBOT: &str = "% test robot\n\
        DH = [ -pi/2 0.35 0 0.675; ...\n\
                0 1.15 0 0; ...\n\
                pi/2 0.041 0 0; ...\n\
               -pi/2 0 0 1.0; ...\n\
                pi/2 0 0 0; ...\n\
                0 0 0 0.215 ];\n";

    #[test]
    fn test_robot_from_text() {
        let robot = robot_from_str("Test", ROBOT).unwrap();
        assert_eq!(robot.name, "Test");
        assert_eq!(robot.table.rows[0].alpha, -PI / 2.0);
        assert_eq!(robot.table.rows[0].d, 0.675);
        assert_eq!(robot.table.rows[5].d, 0.215);
    }

    #[test]
    fn test_robot_table_written_and_read_back() {
        let robot = robot_from_str("Test", ROBOT).unwrap();
        let again = robot_from_str("Test", &robot.table.to_matlab()).unwrap();
        for (a, b) in robot.table.rows.iter().zip(again.table.rows.iter()) {
            assert!((a.alpha - b.alpha).abs() < 1e-12);
            assert!((a.a - b.a).abs() < 1e-12);
            assert!((a.theta - b.theta).abs() < 1e-12);
            assert!((a.d - b.d).abs() < 1e-12);
        }
    }

    #[test]
    fn test_robot_wrong_shape() {
        let result = robot_from_str("Bad", "DH = [1 2 3 4; 5 6 7 8];");
        assert!(matches!(result, Err(DescriptorError::MatrixNotFound { .. })));
    }

    #[test]
    fn test_tool_transposed_literal() {
        // Written column by column, so the translation is in the last row before transposing
        let text = "T_TCP = [1 0 0 0; 0 1 0 0; 0 0 1 0; 0.01 0 0.2 1]';";
        let tool = tool_from_str("Drill", text).unwrap();
        assert_eq!(tool.transform[(0, 3)], 0.01);
        assert_eq!(tool.transform[(2, 3)], 0.2);
        let iso = tool.isometry();
        assert!((iso.translation.vector.z - 0.2).abs() < 1e-12);
        assert!(iso.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_tool_must_be_rigid() {
        let scaled = "tool = [2 0 0 0; 0 1 0 0; 0 0 1 0; 0 0 0 1];";
        assert!(matches!(tool_from_str("Bad", scaled), Err(DescriptorError::InvalidMatrix(_))));

        let bottom = "tool = [1 0 0 0; 0 1 0 0; 0 0 1 0; 0 0 1 1];";
        assert!(tool_from_str("Bad", bottom).is_err());

        let mirror = "tool = [1 0 0 0; 0 1 0 0; 0 0 -1 0; 0 0 0 1];";
        assert!(tool_from_str("Bad", mirror).is_err());
    }

    #[test]
    fn test_error_names_the_file() {
        let err = load_robot("src/tests/data/RobotResources/RobotModels/NoTable.m").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("NoTable.m"), "{}", message);
        assert!(message.contains("missing a DH matrix"), "{}", message);

        let err = load_tool("src/tests/data/RobotResources/Tools/Absent.m").unwrap_err();
        assert!(err.to_string().contains("Absent.m"));
    }
}
