use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-day call attempt caps, counted from the day of the first call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CallAttemptSettings {
    pub day1: u32,
    pub day2: u32,
    pub day3: u32,
    pub day4: u32,
    pub day5: u32,
    pub day6: u32,
}

impl CallAttemptSettings {
    /// Caps as an array indexed by day (0 = day 1).
    #[must_use]
    pub const fn as_array(&self) -> [u32; 6] {
        [
            self.day1, self.day2, self.day3, self.day4, self.day5, self.day6,
        ]
    }

    #[must_use]
    pub const fn from_array(caps: [u32; 6]) -> Self {
        Self {
            day1: caps[0],
            day2: caps[1],
            day3: caps[2],
            day4: caps[3],
            day5: caps[4],
            day6: caps[5],
        }
    }
}

impl Default for CallAttemptSettings {
    fn default() -> Self {
        Self::from_array([5, 4, 2, 2, 2, 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_roundtrip() {
        let s = CallAttemptSettings::from_array([1, 2, 3, 4, 5, 6]);
        assert_eq!(s.day4, 4);
        assert_eq!(s.as_array(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn negative_caps_are_rejected_by_serde() {
        let json = r#"{"day1":-1,"day2":0,"day3":0,"day4":0,"day5":0,"day6":0}"#;
        assert!(serde_json::from_str::<CallAttemptSettings>(json).is_err());
    }
}
