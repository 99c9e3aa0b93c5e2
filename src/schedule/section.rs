//! Section record and its invariants

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named, timed segment of a schedule.
///
/// Serialized as `{"name": ..., "duration": ...}` with the duration in
/// whole minutes, both in the local slot and inside share tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
}

impl Section {
    /// Build a section, enforcing a non-empty name and a positive duration
    pub fn new(name: impl Into<String>, duration_minutes: i64) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration { duration: duration_minutes });
        }
        let duration_minutes = u32::try_from(duration_minutes)
            .map_err(|_| ValidationError::DurationTooLarge { duration: duration_minutes })?;

        Ok(Self { name, duration_minutes })
    }

    /// Check an already-built record (e.g. one deserialized from a token)
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration { duration: 0 });
        }
        Ok(())
    }

    /// Length of the section in seconds
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_valid_input() {
        let section = Section::new("Intro", 5).unwrap();
        assert_eq!(section.name, "Intro");
        assert_eq!(section.duration_minutes, 5);
        assert_eq!(section.duration_seconds(), 300);
    }

    #[test]
    fn new_rejects_empty_and_blank_names() {
        assert_eq!(Section::new("", 5), Err(ValidationError::EmptyName));
        assert_eq!(Section::new("   ", 5), Err(ValidationError::EmptyName));
    }

    #[test]
    fn new_rejects_non_positive_durations() {
        assert_eq!(
            Section::new("Break", 0),
            Err(ValidationError::NonPositiveDuration { duration: 0 })
        );
        assert!(Section::new("Break", -3).is_err());
    }

    #[test]
    fn new_reports_oversized_durations_as_too_large() {
        let duration = i64::from(u32::MAX) + 1;
        assert_eq!(
            Section::new("Marathon", duration),
            Err(ValidationError::DurationTooLarge { duration })
        );
        assert_eq!(
            Section::new("Marathon", i64::from(u32::MAX)).unwrap().duration_minutes,
            u32::MAX
        );
    }

    #[test]
    fn serializes_with_duration_key() {
        let section = Section::new("Main", 2).unwrap();
        let json = serde_json::to_string(&section).unwrap();
        assert_eq!(json, r#"{"name":"Main","duration":2}"#);
    }

    #[test]
    fn validate_flags_zero_duration_from_untrusted_data() {
        let section: Section = serde_json::from_str(r#"{"name":"x","duration":0}"#).unwrap();
        assert!(section.validate().is_err());
    }
}
