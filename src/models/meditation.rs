use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A completed guided-meditation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeditationSession {
    /// Session title from the practice catalog, or free-form
    pub title: String,
    pub minutes: u32,
    pub date: NaiveDate,
}

impl MeditationSession {
    /// Collection this payload lives in.
    pub const COLLECTION: &'static str = "meditationLog";

    pub fn new(title: impl Into<String>, minutes: u32, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            minutes,
            date,
        }
    }
}

impl fmt::Display for MeditationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} min) on {}", self.title, self.minutes, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meditation_session_new() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let session = MeditationSession::new("Mindful Breathing", 5, date);
        assert_eq!(session.title, "Mindful Breathing");
        assert_eq!(session.minutes, 5);
        assert_eq!(session.date, date);
    }

    #[test]
    fn test_meditation_session_display() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let session = MeditationSession::new("Body Scan", 15, date);
        let output = format!("{}", session);
        assert!(output.contains("Body Scan"));
        assert!(output.contains("15 min"));
    }

    #[test]
    fn test_meditation_session_json_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let session = MeditationSession::new("Loving-Kindness", 10, date);
        let json = serde_json::to_string(&session).unwrap();
        let parsed: MeditationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }
}
