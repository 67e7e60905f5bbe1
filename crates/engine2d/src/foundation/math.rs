//! Math utilities and types
//!
//! Provides the 2D vector types and unit conversions used by components and systems.

pub use nalgebra::{Vector2, Matrix3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// 3x3 homogeneous matrix used for 2D transforms
pub type Mat3 = Matrix3<f32>;

/// Wrap an angle in degrees into the `[-180, 180]` range
pub fn wrap_degrees(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Convert a pixel-space vector into physics meters
pub fn pixel_to_meter(pixels: Vec2, pixels_per_meter: f32) -> Vec2 {
    pixels / pixels_per_meter
}

/// Convert a physics-space vector into pixels
pub fn meter_to_pixel(meters: Vec2, pixels_per_meter: f32) -> Vec2 {
    meters * pixels_per_meter
}

/// Build a 2D TRS matrix (translation, rotation in degrees, scale)
pub fn trs_matrix(position: Vec2, angle_degrees: f32, scale: Vec2) -> Mat3 {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    Mat3::new(
        cos * scale.x, -sin * scale.y, position.x,
        sin * scale.x, cos * scale.y, position.y,
        0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(wrap_degrees(190.0), -170.0);
        assert_relative_eq!(wrap_degrees(-190.0), 170.0);
        assert_relative_eq!(wrap_degrees(720.0 + 45.0), 45.0);
        assert_relative_eq!(wrap_degrees(90.0), 90.0);
    }

    #[test]
    fn test_pixel_meter_roundtrip() {
        let pixels = Vec2::new(250.0, -100.0);
        let meters = pixel_to_meter(pixels, 100.0);
        assert_relative_eq!(meters.x, 2.5);
        assert_relative_eq!(meter_to_pixel(meters, 100.0).y, -100.0);
    }

    #[test]
    fn test_trs_translation_only() {
        let m = trs_matrix(Vec2::new(3.0, 4.0), 0.0, Vec2::new(1.0, 1.0));
        let p = m.transform_point(&Point2::new(1.0, 1.0));
        assert_relative_eq!(p.x, 4.0);
        assert_relative_eq!(p.y, 5.0);
    }
}
