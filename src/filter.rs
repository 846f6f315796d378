// src/filter.rs
//
// Retention gate for captured lines.

/// Optional case-insensitive substring filter. A dropped line is excluded
/// from display, persistence, sequence numbering, and statistics, as if it
/// was never read.
#[derive(Clone, Debug, Default)]
pub struct LineFilter {
    raw: Option<String>,
    needle: Option<String>,
}

impl LineFilter {
    pub fn new(filter: Option<&str>) -> Self {
        LineFilter {
            raw: filter.map(str::to_string),
            needle: filter.map(|f| f.to_lowercase()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.needle.is_some()
    }

    /// Retain when no filter is configured, or the substring occurs anywhere
    /// in the line, case-insensitively.
    pub fn retains(&self, line: &str) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => line.to_lowercase().contains(needle.as_str()),
        }
    }

    /// The configured substring as given, for the session header.
    pub fn describe(&self) -> &str {
        self.raw.as_deref().unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter_retains_everything() {
        let filter = LineFilter::new(None);
        assert!(!filter.is_active());
        assert!(filter.retains("anything at all"));
        assert_eq!(filter.describe(), "none");
    }

    #[test]
    fn test_case_insensitive_containment() {
        let filter = LineFilter::new(Some("MQTT"));
        assert!(filter.retains("+mqtt: connected"));
        assert!(filter.retains("MQTT broker lost"));
        assert!(!filter.retains("wifi connected"));
    }

    #[test]
    fn test_describe_keeps_original_casing() {
        let filter = LineFilter::new(Some("MQTT"));
        assert_eq!(filter.describe(), "MQTT");
    }
}
