#[cfg(test)]
mod tests {
    extern crate rand;

    use nalgebra::{Matrix3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::instruction::Orientation;
    use crate::pose::{default_rotation, make_transform, rotation_from_orientation, split_transform};

    const TOLERANCE: f64 = 1e-12;

    fn random_unit_quaternion(rng: &mut StdRng) -> Orientation {
        loop {
            let q: [f64; 4] = std::array::from_fn(|_| rng.gen_range(-1.0..1.0));
            let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 1e-3 {
                return Orientation::Quaternion { w: q[0] / norm, x: q[1] / norm, y: q[2] / norm, z: q[3] / norm };
            }
        }
    }

    #[test]
    fn test_random_quaternions_give_rotations() {
        let mut rng = StdRng::from_seed([7u8; 32]);
        for _ in 0..2048 {
            let orientation = random_unit_quaternion(&mut rng);
            let r = rotation_from_orientation(Some(&orientation));
            assert!((r * r.transpose() - Matrix3::identity()).amax() < TOLERANCE, "{:?}", orientation);
            assert!((r.determinant() - 1.0).abs() < TOLERANCE, "{:?}", orientation);
        }
    }

    #[test]
    fn test_random_rpy_give_rotations() {
        let mut rng = StdRng::from_seed([11u8; 32]);
        for _ in 0..2048 {
            let orientation = Orientation::Rpy {
                roll: rng.gen_range(-4.0..4.0),
                pitch: rng.gen_range(-4.0..4.0),
                yaw: rng.gen_range(-4.0..4.0),
            };
            let r = rotation_from_orientation(Some(&orientation));
            assert!((r * r.transpose() - Matrix3::identity()).amax() < TOLERANCE);
            assert!((r.determinant() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_absent_orientation_is_default() {
        let expected = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        assert_eq!(rotation_from_orientation(None), expected);
        assert_eq!(default_rotation(), expected);
    }

    #[test]
    fn test_make_transform_round_trips_exactly() {
        let mut rng = StdRng::from_seed([3u8; 32]);
        for _ in 0..256 {
            let rotation = rotation_from_orientation(Some(&random_unit_quaternion(&mut rng)));
            let translation = Vector3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            let (r, t) = split_transform(&make_transform(&rotation, &translation));
            assert_eq!(r, rotation);
            assert_eq!(t, translation);
        }
    }
}
