use serde::{Deserialize, Serialize};

/// Static capability profile for a named agent.
///
/// Owned exclusively by the worker registry; the performance score is the
/// only field updated over time, fed by execution feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentCapability {
    /// Agent name, e.g. "code-reviewer"
    pub name: String,

    /// Broad expertise tags matched against operation text
    pub expertise: Vec<String>,

    /// Narrow specialties matched against operation text
    pub specialties: Vec<String>,

    /// Maximum concurrent tasks this agent can carry
    pub capacity: usize,

    /// Performance score, 0-100
    pub performance: f64,
}

impl AgentCapability {
    pub fn new(
        name: impl Into<String>,
        expertise: Vec<String>,
        specialties: Vec<String>,
        capacity: usize,
        performance: f64,
    ) -> Self {
        Self {
            name: name.into(),
            expertise,
            specialties,
            capacity,
            performance: performance.clamp(0.0, 100.0),
        }
    }

    /// Case-insensitive check that any expertise or specialty tag appears in
    /// the given text
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.expertise
            .iter()
            .chain(self.specialties.iter())
            .any(|tag| text.contains(&tag.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer() -> AgentCapability {
        AgentCapability::new(
            "code-reviewer",
            vec!["review".to_string(), "quality".to_string()],
            vec!["static-analysis".to_string()],
            3,
            88.0,
        )
    }

    #[test]
    fn test_matches_expertise_substring() {
        let cap = reviewer();
        assert!(cap.matches("please review this change"));
        assert!(cap.matches("QUALITY pass"));
        assert!(!cap.matches("deploy to production"));
    }

    #[test]
    fn test_matches_specialty() {
        let cap = reviewer();
        assert!(cap.matches("run static-analysis on the module"));
    }

    #[test]
    fn test_partial_tag_in_text_does_not_match() {
        let cap = reviewer();
        // A fragment of a tag is not a match; the full tag must appear
        assert!(!cap.matches("static"));
        assert!(!cap.matches("qua"));
    }

    #[test]
    fn test_performance_clamped() {
        let cap = AgentCapability::new("x", vec![], vec![], 1, 150.0);
        assert!((cap.performance - 100.0).abs() < f64::EPSILON);
    }
}
