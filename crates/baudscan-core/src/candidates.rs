//! Candidate speed generation
//!
//! Two modes: an arithmetic range with an exclusive upper bound, or an
//! explicit ordered list. Both are validated when built, so a source that
//! exists can always be consumed without errors.

use crate::{ConfigError, Speed};

/// Ordered, finite, forward-only sequence of speeds to try
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// `min, min + step, ...` while `< max`
    Incremental {
        /// Next speed to yield
        next: Option<Speed>,
        /// Exclusive upper bound
        max: Speed,
        /// Increment between candidates
        step: Speed,
    },
    /// Explicit speeds in the given order
    List(std::vec::IntoIter<Speed>),
}

impl CandidateSource {
    /// Build a half-open range `[min, max)` stepping by `step`
    pub fn incremental(min: Speed, max: Speed, step: Speed) -> Result<Self, ConfigError> {
        if min == 0 {
            return Err(ConfigError::InvalidSpeed(min));
        }
        if step == 0 {
            return Err(ConfigError::InvalidStep(step));
        }
        if min >= max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(CandidateSource::Incremental {
            next: Some(min),
            max,
            step,
        })
    }

    /// Build from explicit speeds; duplicates are kept
    pub fn from_list(speeds: Vec<Speed>) -> Result<Self, ConfigError> {
        if speeds.is_empty() {
            return Err(ConfigError::EmptyList);
        }
        if let Some(&zero) = speeds.iter().find(|&&s| s == 0) {
            return Err(ConfigError::InvalidSpeed(zero));
        }
        Ok(CandidateSource::List(speeds.into_iter()))
    }

    /// Parse a comma-separated list such as `"9600, 19200,38400"`
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        if list.trim().is_empty() {
            return Err(ConfigError::EmptyList);
        }
        let speeds = list
            .split(',')
            .map(str::trim)
            .map(|entry| {
                entry
                    .parse::<Speed>()
                    .map_err(|_| ConfigError::InvalidListEntry(entry.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_list(speeds)
    }
}

impl Iterator for CandidateSource {
    type Item = Speed;

    fn next(&mut self) -> Option<Speed> {
        match self {
            CandidateSource::Incremental { next, max, step } => {
                let current = next.take()?;
                if current >= *max {
                    return None;
                }
                // Overflow past u32::MAX ends the range
                *next = current.checked_add(*step);
                Some(current)
            }
            CandidateSource::List(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_incremental_excludes_max() {
        let speeds: Vec<_> = CandidateSource::incremental(300, 1200, 300).unwrap().collect();
        assert_eq!(speeds, vec![300, 600, 900]);
    }

    #[test]
    fn test_incremental_uneven_step() {
        let speeds: Vec<_> = CandidateSource::incremental(300, 1000, 300).unwrap().collect();
        assert_eq!(speeds, vec![300, 600, 900]);
    }

    #[test]
    fn test_incremental_near_u32_max() {
        let speeds: Vec<_> = CandidateSource::incremental(u32::MAX - 3, u32::MAX, 2)
            .unwrap()
            .collect();
        assert_eq!(speeds, vec![u32::MAX - 3, u32::MAX - 1]);
    }

    #[test]
    fn test_incremental_rejects_bad_range() {
        assert!(matches!(
            CandidateSource::incremental(1200, 1200, 300),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            CandidateSource::incremental(300, 1200, 0),
            Err(ConfigError::InvalidStep(0))
        ));
        assert!(matches!(
            CandidateSource::incremental(0, 1200, 300),
            Err(ConfigError::InvalidSpeed(0))
        ));
    }

    #[test]
    fn test_list_trims_and_keeps_order() {
        let speeds: Vec<_> = CandidateSource::parse_list("9600, 19200,38400")
            .unwrap()
            .collect();
        assert_eq!(speeds, vec![9600, 19200, 38400]);
    }

    #[test]
    fn test_list_keeps_duplicates() {
        let speeds: Vec<_> = CandidateSource::parse_list("9600,9600, 115200")
            .unwrap()
            .collect();
        assert_eq!(speeds, vec![9600, 9600, 115200]);
    }

    #[test]
    fn test_list_rejects_empty_and_garbage() {
        assert!(matches!(
            CandidateSource::parse_list("  "),
            Err(ConfigError::EmptyList)
        ));
        assert!(matches!(
            CandidateSource::parse_list("9600,,19200"),
            Err(ConfigError::InvalidListEntry(_))
        ));
        assert!(matches!(
            CandidateSource::parse_list("9600,fast"),
            Err(ConfigError::InvalidListEntry(_))
        ));
        assert!(matches!(
            CandidateSource::parse_list("0"),
            Err(ConfigError::InvalidSpeed(0))
        ));
    }
}
