/*
Nightglow - Night Pond Scene
*/
use bevy::math::Vec2;

/// Below This, Smoothing Times Are Treated as Instant
const MIN_SMOOTH_TIME: f32 = 0.0001;

/// Clamped Linear Interpolation (t Outside 0..1 is Clamped)
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// Position of `value` Between `from` and `to`, Clamped to 0..1
/// A Degenerate Range Returns 0 Instead of Dividing by Zero
pub fn inverse_lerp(from: f32, to: f32, value: f32) -> f32 {
    let span = to - from;
    if span.abs() <= f32::EPSILON {
        return 0.0;
    }
    ((value - from) / span).clamp(0.0, 1.0)
}

/// Frame-Rate Scaled Approach: Moves `rate * dt` of the Remaining Gap
/// dt == 0 Leaves `current` Untouched
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    lerp(current, target, rate * dt)
}

/// Fade Curve Driven by Elapsed Time Only
///
/// Replaces a per-frame suspended loop: the caller owns `elapsed` and calls
/// this once per tick. A non-positive `duration` jumps straight to `to`.
pub fn interpolate(elapsed: f32, duration: f32, from: f32, to: f32) -> f32 {
    if duration <= 0.0 || !duration.is_finite() {
        return to;
    }
    let progress = (elapsed / duration).clamp(0.0, 1.0);
    from + (to - from) * progress
}

/// Signed Shortest Difference Between Two Angles in Degrees (-180..=180)
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + delta_angle(from, to) * t.clamp(0.0, 1.0)
}

/// Critically Damped Spring Step (Scalar)
///
/// `velocity` is carried between calls by the caller. The step never
/// overshoots `target`, and the rate of change is capped at `max_speed`.
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> f32 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let max_change = max_speed * smooth_time;
    let change = (current - target).clamp(-max_change, max_change);
    let clamped_target = current - change;

    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = clamped_target + (change + temp) * decay;

    // Overshoot Guard
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}

/// Critically Damped Spring Step (Vec2), Same Contract as [`smooth_damp`]
pub fn smooth_damp_vec2(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> Vec2 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let max_change = max_speed * smooth_time;
    let change = (current - target).clamp_length_max(max_change);
    let clamped_target = current - change;

    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = clamped_target + (change + temp) * decay;

    // Overshoot Guard
    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = Vec2::ZERO;
    }
    output
}

/// Angle Variant of [`smooth_damp`] (Degrees, Wraps Through the Short Side)
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> f32 {
    let target = current + delta_angle(current, target);
    smooth_damp(current, target, velocity, smooth_time, max_speed, dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_clamps_progress() {
        assert_eq!(interpolate(-1.0, 2.0, 0.0, 1.0), 0.0);
        assert_eq!(interpolate(1.0, 2.0, 0.0, 1.0), 0.5);
        assert_eq!(interpolate(5.0, 2.0, 0.0, 1.0), 1.0);
        assert_eq!(interpolate(0.0, 2.0, 0.8, 0.0), 0.8);
    }

    #[test]
    fn test_interpolate_zero_duration_jumps_to_end() {
        assert_eq!(interpolate(0.0, 0.0, 0.2, 0.9), 0.9);
        assert_eq!(interpolate(0.0, -1.0, 0.2, 0.9), 0.9);
    }

    #[test]
    fn test_inverse_lerp_guards_degenerate_range() {
        assert_eq!(inverse_lerp(0.0, 0.0, 3.0), 0.0);
        assert_eq!(inverse_lerp(0.0, 4.0, 2.0), 0.5);
        assert_eq!(inverse_lerp(0.0, 4.0, 9.0), 1.0);
    }

    #[test]
    fn test_delta_angle_wraps() {
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_smooth_damp_zero_dt_is_noop() {
        let mut vel = Vec2::new(1.0, -2.0);
        let out = smooth_damp_vec2(Vec2::ONE, Vec2::ZERO, &mut vel, 0.3, 10.0, 0.0);
        assert_eq!(out, Vec2::ONE);
        assert_eq!(vel, Vec2::new(1.0, -2.0));
    }

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let target = Vec2::new(3.0, 0.0);
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        for _ in 0..600 {
            pos = smooth_damp_vec2(pos, target, &mut vel, 0.2, 100.0, 1.0 / 60.0);
            assert!(pos.x <= target.x + 1e-4);
        }
        assert!((pos - target).length() < 1e-3);
    }

    #[test]
    fn test_smooth_damp_respects_speed_cap() {
        let mut vel = Vec2::ZERO;
        let out = smooth_damp_vec2(Vec2::ZERO, Vec2::new(100.0, 0.0), &mut vel, 0.5, 2.0, 0.1);
        // Change is Capped at max_speed * smooth_time Before the Spring Step
        assert!(out.x <= 2.0 * 0.5 + 1e-4);
    }
}
