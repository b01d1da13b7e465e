//! Class activation maps.

use crate::error::{CoreError, Result};

/// A single-channel relevance map over image space.
///
/// Values are stored row-major. A finished map holds values in `[0, 1]`;
/// intermediate maps produced during attribution may hold arbitrary floats
/// until [`Cam::normalize`] is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Cam {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Cam {
    /// Create a map from a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(CoreError::ShapeMismatch(format!(
                "CAM buffer holds {} values, expected {}x{} = {}",
                data.len(),
                width,
                height,
                width * height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An all-zero map.
    #[must_use]
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Map width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Map height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The row-major value buffer.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume self and return the value buffer.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value at pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the map.
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> f32 {
        assert!(x < self.width && y < self.height, "CAM index out of bounds");
        self.data[y * self.width + x]
    }

    /// Minimum and maximum values over the map; `(0, 0)` for an empty map.
    #[must_use]
    pub fn min_max(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.data {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if min > max {
            (0.0, 0.0)
        } else {
            (min, max)
        }
    }

    /// Whether every value equals every other (a degenerate map).
    #[must_use]
    pub fn is_flat(&self) -> bool {
        let (min, max) = self.min_max();
        min == max
    }

    /// Min-max rescale to `[0, 1]`.
    ///
    /// A flat map (max == min) becomes all zeros rather than dividing by
    /// zero; a uniformly irrelevant map is a legitimate outcome.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        let (min, max) = self.min_max();
        if max > min {
            let range = max - min;
            for v in &mut self.data {
                *v = (*v - min) / range;
            }
        } else {
            for v in &mut self.data {
                *v = 0.0;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(Cam::new(2, 2, vec![0.0; 3]).is_err());
        assert!(Cam::new(2, 2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn test_normalize_rescales() {
        let cam = Cam::new(2, 2, vec![1.0, 2.0, 3.0, 5.0]).unwrap();
        let normalized = cam.normalize();
        assert_eq!(normalized.value(0, 0), 0.0);
        assert_eq!(normalized.value(1, 1), 1.0);
        assert!((normalized.value(1, 0) - 0.25).abs() < 1e-6);
        for &v in normalized.data() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_normalize_flat_yields_zeros() {
        let cam = Cam::new(3, 1, vec![0.7, 0.7, 0.7]).unwrap();
        let normalized = cam.normalize();
        assert!(normalized.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_value_row_major() {
        let cam = Cam::new(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(cam.value(2, 0), 2.0);
        assert_eq!(cam.value(0, 1), 3.0);
    }
}
