#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;
    use std::path::Path;

    use crate::descriptor::{load_robot, load_tool};
    use crate::descriptor_error::{DescriptorError, DescriptorKind};
    use crate::matrix_literal::{extract_matrix, parse_matrices};
    use crate::tests::test_utils::{RESOURCES, SEMANTIC_RESOURCES};

    const READ_ERROR: &str = "Failed to load descriptor";

    #[test]
    fn test_robot_fixture() {
        let robot = load_robot(Path::new(RESOURCES).join("RobotModels/KR120R2500.m")).expect(READ_ERROR);
        assert_eq!(robot.name, "KR120R2500");
        let rows = robot.table.rows;
        assert_eq!(rows[0].alpha, -FRAC_PI_2);
        assert_eq!(rows[0].a, 0.35);
        assert_eq!(rows[0].d, 0.675);
        assert_eq!(rows[1].theta, -FRAC_PI_2);
        assert_eq!(rows[2].a, 0.041);
        assert_eq!(rows[3].d, 1.0);
        assert_eq!(rows[5].d, 0.215);
        assert!(robot.table.to_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_robot_fixture_other_matrices_skipped() {
        let text = std::fs::read_to_string(Path::new(RESOURCES).join("RobotModels/KR120R2500.m")).unwrap();
        let all = parse_matrices(&text).unwrap();
        assert_eq!(all.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["q_home", "DH"]);
        assert_eq!(extract_matrix(&text, &["DH"], (6, 4)).unwrap().name, "DH");
    }

    #[test]
    fn test_tool_fixtures() {
        let drill = load_tool(Path::new(RESOURCES).join("Tools/Drill_8mm.m")).expect(READ_ERROR);
        assert_eq!(drill.name, "Drill_8mm");
        assert_eq!(drill.transform[(2, 3)], 0.15);
        assert_eq!(drill.transform.fixed_view::<3, 3>(0, 0).into_owned(), nalgebra::Matrix3::identity());

        let holder = load_tool(Path::new(SEMANTIC_RESOURCES).join("Tools/Spindle_Holder.m")).expect(READ_ERROR);
        assert_eq!(holder.transform, nalgebra::Matrix4::identity());
    }

    #[test]
    fn test_missing_table_names_file() {
        let err = load_robot(Path::new(RESOURCES).join("RobotModels/NoTable.m")).unwrap_err();
        match &err {
            DescriptorError::InFile { kind, source, .. } => {
                assert_eq!(*kind, DescriptorKind::Robot);
                assert!(matches!(**source, DescriptorError::MatrixNotFound { shape: (6, 4), .. }));
            }
            other => panic!("Unexpected error {:?}", other),
        }
        assert!(err.to_string().starts_with("Robot file NoTable.m is missing a DH matrix"), "{}", err);
    }

    #[test]
    fn test_non_rigid_tool_names_file() {
        let err = load_tool(Path::new(RESOURCES).join("Tools/Warped_Gripper.m")).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Tool file Warped_Gripper.m is missing a TCP transform"), "{}", message);
        assert!(message.contains("not orthonormal"), "{}", message);
    }

    #[test]
    fn test_robot_file_is_not_a_tool() {
        // A 6x4 table is no 4x4 transform
        let err = load_tool(Path::new(RESOURCES).join("RobotModels/KR120R2500.m")).unwrap_err();
        assert!(err.to_string().contains("KR120R2500.m"));
    }
}
