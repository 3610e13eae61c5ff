use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Priority of a delegation request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for RequestPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for RequestPriority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(anyhow::anyhow!("Invalid request priority: {s}")),
        }
    }
}

/// Risk classification carried in the request context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(anyhow::anyhow!("Invalid risk level: {s}")),
        }
    }
}

/// Semi-structured context accompanying a delegation request.
///
/// The recognized fields feed the complexity scorer; anything else the caller
/// sends lands in `extra` and is ignored by scoring, which keeps unknown keys
/// forward-compatible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestContext {
    /// Number of files touched by the requested work
    #[serde(default)]
    pub file_count: Option<u64>,

    /// Rough change volume (lines, hunks, whatever the caller measures)
    #[serde(default)]
    pub change_volume: Option<u64>,

    /// Number of dependencies implicated
    #[serde(default)]
    pub dependencies: Option<u64>,

    /// Caller-assessed risk level
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,

    /// Caller estimate of duration in minutes (advisory only)
    #[serde(default)]
    pub estimated_duration_mins: Option<u64>,

    /// Unrecognized fields, preserved but not scored
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl RequestContext {
    /// Caller hint for how many agents to use, read from the open extension
    /// map. Absent or non-numeric hints are ignored.
    pub fn agent_count_hint(&self) -> Option<usize> {
        self.extra
            .get("estimated_agents")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .filter(|n| *n >= 1)
    }
}

/// An incoming work request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DelegationRequest {
    /// Operation tag (free string, e.g. "refactor", "security-review")
    pub operation: String,

    /// Free-text description of the work
    #[serde(default)]
    pub description: String,

    /// Semi-structured scoring context
    #[serde(default)]
    pub context: RequestContext,

    /// Session this request belongs to, if any
    #[serde(default)]
    pub session_id: Option<String>,

    /// Request priority
    #[serde(default)]
    pub priority: RequestPriority,

    /// Explicit agent mention; forces single-agent delegation to that agent
    #[serde(default)]
    pub mention_agent: Option<String>,

    /// Forces multi-agent delegation regardless of score
    #[serde(default)]
    pub force_multi_agent: bool,

    /// Explicit team for forced multi-agent delegation
    #[serde(default)]
    pub required_agents: Option<Vec<String>>,
}

impl DelegationRequest {
    /// Create a minimal request with the given operation and description
    pub fn new(operation: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            description: description.into(),
            context: RequestContext::default(),
            session_id: None,
            priority: RequestPriority::default(),
            mention_agent: None,
            force_multi_agent: false,
            required_agents: None,
        }
    }

    /// Combined operation + description text used for keyword matching
    pub fn match_text(&self) -> String {
        format!("{} {}", self.operation, self.description).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_round_trip() {
        assert_eq!("high".parse::<RequestPriority>().unwrap(), RequestPriority::High);
        assert_eq!("HIGH".parse::<RequestPriority>().unwrap(), RequestPriority::High);
        assert_eq!(RequestPriority::Low.to_string(), "low");
        assert!("urgent".parse::<RequestPriority>().is_err());
    }

    #[test]
    fn test_risk_level_parse() {
        assert_eq!("critical".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_context_unknown_keys_preserved() {
        let ctx: RequestContext = serde_json::from_value(json!({
            "file_count": 3,
            "team_name": "platform",
        }))
        .unwrap();

        assert_eq!(ctx.file_count, Some(3));
        assert_eq!(ctx.extra.get("team_name"), Some(&json!("platform")));
    }

    #[test]
    fn test_agent_count_hint() {
        let mut ctx = RequestContext::default();
        assert_eq!(ctx.agent_count_hint(), None);

        ctx.extra.insert("estimated_agents".to_string(), json!(4));
        assert_eq!(ctx.agent_count_hint(), Some(4));

        ctx.extra.insert("estimated_agents".to_string(), json!(0));
        assert_eq!(ctx.agent_count_hint(), None);

        ctx.extra.insert("estimated_agents".to_string(), json!("three"));
        assert_eq!(ctx.agent_count_hint(), None);
    }

    #[test]
    fn test_match_text_lowercases() {
        let req = DelegationRequest::new("Refactor", "Split the God Module");
        assert_eq!(req.match_text(), "refactor split the god module");
    }
}
