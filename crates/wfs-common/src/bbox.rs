//! Bounding box used to restrict a WFS request spatially.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounding box in the coordinates of its accompanying CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse bounds given as `"left bottom right top"` or `"[left, bottom, right, top]"`.
    ///
    /// Commas and whitespace are both accepted as separators, so the output of
    /// tools like `fio info --bounds` can be passed straight through.
    pub fn from_bounds_string(s: &str) -> Result<Self, BoundsParseError> {
        let trimmed = s.trim_matches(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace());
        let parts: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 4 {
            return Err(BoundsParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| BoundsParseError::InvalidNumber(part.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Coordinates in `[min_x, min_y, max_x, max_y]` order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoundsParseError {
    #[error("{0:?} is not a valid bounding box representation")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space_separated() {
        let bbox = BoundingBox::from_bounds_string("1188000 400000 1190000 402000").unwrap();
        assert_eq!(bbox.min_x, 1188000.0);
        assert_eq!(bbox.min_y, 400000.0);
        assert_eq!(bbox.max_x, 1190000.0);
        assert_eq!(bbox.max_y, 402000.0);
    }

    #[test]
    fn test_display_is_cql_ready() {
        let bbox = BoundingBox::new(1.0, 2.5, 3.0, 4.0);
        assert_eq!(bbox.to_string(), "1, 2.5, 3, 4");
    }
}
