//! Merise cardinalities.

use std::fmt;
use std::str::FromStr;

/// Lower bound of a participation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinBound {
    /// Optional participation
    Zero,
    /// Mandatory participation
    One,
}

/// Upper bound of a participation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxBound {
    One,
    Many,
}

/// How many occurrences of an association each occurrence of an entity takes
/// part in. Only the four Merise values are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    min: MinBound,
    max: MaxBound,
}

impl Cardinality {
    /// `0,1`
    pub const ZERO_ONE: Cardinality = Cardinality::new(MinBound::Zero, MaxBound::One);
    /// `1,1`
    pub const ONE_ONE: Cardinality = Cardinality::new(MinBound::One, MaxBound::One);
    /// `0,n`
    pub const ZERO_MANY: Cardinality = Cardinality::new(MinBound::Zero, MaxBound::Many);
    /// `1,n`
    pub const ONE_MANY: Cardinality = Cardinality::new(MinBound::One, MaxBound::Many);

    pub const fn new(min: MinBound, max: MaxBound) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> MinBound {
        self.min
    }

    pub fn max(&self) -> MaxBound {
        self.max
    }

    /// `max = n`
    pub fn is_many(&self) -> bool {
        self.max == MaxBound::Many
    }

    /// `max = 1`
    pub fn is_one(&self) -> bool {
        self.max == MaxBound::One
    }

    /// `min = 0`
    pub fn is_optional(&self) -> bool {
        self.min == MinBound::Zero
    }

    /// `min = 1`
    pub fn is_mandatory(&self) -> bool {
        self.min == MinBound::One
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = match self.min {
            MinBound::Zero => "0",
            MinBound::One => "1",
        };
        let max = match self.max {
            MaxBound::One => "1",
            MaxBound::Many => "n",
        };
        write!(f, "{},{}", min, max)
    }
}

impl FromStr for Cardinality {
    type Err = String;

    /// Accepts `min,max` with optional spaces and parentheses; `N` is read as `n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let Some((min, max)) = inner.split_once(',') else {
            return Err(format!(
                "Unknown cardinality: {}. Valid options: 0,1 1,1 0,n 1,n",
                s
            ));
        };

        let min = match min.trim() {
            "0" => MinBound::Zero,
            "1" => MinBound::One,
            other => {
                return Err(format!(
                    "Invalid minimum '{}' in cardinality {}: expected 0 or 1",
                    other, s
                ))
            }
        };
        let max = match max.trim() {
            "1" => MaxBound::One,
            "n" | "N" => MaxBound::Many,
            other => {
                return Err(format!(
                    "Invalid maximum '{}' in cardinality {}: expected 1 or n",
                    other, s
                ))
            }
        };

        Ok(Cardinality::new(min, max))
    }
}
