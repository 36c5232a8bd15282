use serde::{Deserialize, Serialize};
use std::fmt;

/// A logged mood check-in: how the owner feels, their energy level, and what
/// influenced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: String,
    pub energy: String,
    #[serde(default)]
    pub influences: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl MoodEntry {
    /// Collection this payload lives in.
    pub const COLLECTION: &'static str = "moodEntries";

    pub fn new(mood: impl Into<String>, energy: impl Into<String>) -> Self {
        Self {
            mood: mood.into(),
            energy: energy.into(),
            influences: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_influences(mut self, influences: Vec<String>) -> Self {
        self.influences = influences;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl fmt::Display for MoodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} energy)", self.mood, self.energy)?;
        if !self.influences.is_empty() {
            write!(f, " - {}", self.influences.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_entry_new() {
        let entry = MoodEntry::new("Good", "Moderate");
        assert_eq!(entry.mood, "Good");
        assert_eq!(entry.energy, "Moderate");
        assert!(entry.influences.is_empty());
        assert!(entry.notes.is_empty());
    }

    #[test]
    fn test_mood_entry_builders() {
        let entry = MoodEntry::new("Low", "Exhausted")
            .with_influences(vec!["Work Stress".to_string(), "Tired".to_string()])
            .with_notes("Long week");

        assert_eq!(entry.influences.len(), 2);
        assert_eq!(entry.notes, "Long week");
    }

    #[test]
    fn test_mood_entry_display() {
        let entry =
            MoodEntry::new("Good", "High").with_influences(vec!["Good Sleep".to_string()]);
        let output = format!("{}", entry);
        assert!(output.contains("Good"));
        assert!(output.contains("Good Sleep"));
    }

    #[test]
    fn test_mood_entry_json_roundtrip() {
        let entry = MoodEntry::new("Good", "Moderate").with_notes("Sunny day");
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: MoodEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_mood_entry_defaults_missing_fields() {
        let parsed: MoodEntry =
            serde_json::from_str(r#"{"mood": "Okay", "energy": "Low"}"#).unwrap();
        assert!(parsed.influences.is_empty());
        assert!(parsed.notes.is_empty());
    }
}
