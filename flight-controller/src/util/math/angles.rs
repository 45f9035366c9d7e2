/// Shortest signed rotation from `current` to `target`, in (-180, 180].
/// Non-finite inputs yield zero error.
pub fn angle_error(target: f32, current: f32) -> f32 {
    let difference = target - current;
    if !difference.is_finite() {
        return 0.0;
    }

    let mut error = difference % 360.0;
    if error > 180.0 {
        error -= 360.0;
    } else if error <= -180.0 {
        error += 360.0;
    }
    error
}

/// Heading in [0, 360).
pub fn wrap_degrees_360(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }

    let mut wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn error_takes_the_short_way_round() {
        assert_abs_diff_eq!(angle_error(10.0, 350.0), 20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(angle_error(350.0, 10.0), -20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(angle_error(90.0, 45.0), 45.0);
        assert_eq!(angle_error(0.0, 180.0), 180.0);
        assert_eq!(angle_error(180.0, 0.0), 180.0);
    }

    #[test]
    fn error_is_always_in_half_open_range() {
        let mut seed = 0x2545_f491_u32;
        for _ in 0..10_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let a = (seed >> 8) as f32 / 16_777_216.0 * 4000.0 - 2000.0;
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let b = (seed >> 8) as f32 / 16_777_216.0 * 4000.0 - 2000.0;
            let error = angle_error(a, b);
            assert!(error > -180.0 && error <= 180.0, "{} {} -> {}", a, b, error);
        }
        for (a, b) in [(-180.0, 0.0), (540.0, 0.0), (-540.0, 0.0), (720.0, 0.0)] {
            let error = angle_error(a, b);
            assert!(error > -180.0 && error <= 180.0);
        }
    }

    #[test]
    fn non_finite_error_is_zero() {
        assert_eq!(angle_error(f32::NAN, 0.0), 0.0);
        assert_eq!(angle_error(f32::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn heading_wraps_into_a_full_turn() {
        assert_abs_diff_eq!(wrap_degrees_360(370.0), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_degrees_360(-10.0), 350.0, epsilon = 1e-4);
        assert_eq!(wrap_degrees_360(360.0), 0.0);
        let tiny = wrap_degrees_360(-1.0e-6);
        assert!((0.0..360.0).contains(&tiny));
    }
}
