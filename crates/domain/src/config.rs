//! Workflow service configuration loaded from environment variables.

use std::str::FromStr;

use crate::event_queue::EventQueue;

/// Whether structural edits are allowed while a workflow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// Nodes and connections may change while the workflow runs.
    #[default]
    AllowLiveEdits,

    /// The workflow must be deactivated before its graph changes.
    RequireInactive,
}

impl EditPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditPolicy::AllowLiveEdits => "allow-live-edits",
            EditPolicy::RequireInactive => "require-inactive",
        }
    }
}

impl std::fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow-live-edits" => Ok(EditPolicy::AllowLiveEdits),
            "require-inactive" => Ok(EditPolicy::RequireInactive),
            other => Err(format!("unknown edit policy: {other}")),
        }
    }
}

/// Workflow service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `WORKFLOW_EDIT_POLICY`: `allow-live-edits` or `require-inactive`
///   (default: `allow-live-edits`)
/// - `WORKFLOW_MAX_PENDING_EVENTS`: pending-event queue capacity per
///   workflow (default: `4096`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub edit_policy: EditPolicy,
    pub max_pending_events: usize,
}

impl ServiceConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Unparseable values fall back to
    /// the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let edit_policy = match lookup("WORKFLOW_EDIT_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring WORKFLOW_EDIT_POLICY");
                defaults.edit_policy
            }),
            None => defaults.edit_policy,
        };

        let max_pending_events = lookup("WORKFLOW_MAX_PENDING_EVENTS")
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.max_pending_events);

        Self {
            edit_policy,
            max_pending_events,
        }
    }

    pub fn with_edit_policy(mut self, edit_policy: EditPolicy) -> Self {
        self.edit_policy = edit_policy;
        self
    }

    pub fn with_max_pending_events(mut self, max_pending_events: usize) -> Self {
        self.max_pending_events = max_pending_events;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            edit_policy: EditPolicy::AllowLiveEdits,
            max_pending_events: EventQueue::<()>::DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.edit_policy, EditPolicy::AllowLiveEdits);
        assert_eq!(config.max_pending_events, 4096);
    }

    #[test]
    fn test_reads_variables() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("WORKFLOW_EDIT_POLICY", "require-inactive"),
            ("WORKFLOW_MAX_PENDING_EVENTS", "64"),
        ]));
        assert_eq!(config.edit_policy, EditPolicy::RequireInactive);
        assert_eq!(config.max_pending_events, 64);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("WORKFLOW_EDIT_POLICY", "sometimes"),
            ("WORKFLOW_MAX_PENDING_EVENTS", "0"),
        ]));
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            " Require-Inactive ".parse::<EditPolicy>(),
            Ok(EditPolicy::RequireInactive)
        );
        assert_eq!(
            EditPolicy::AllowLiveEdits.to_string().parse::<EditPolicy>(),
            Ok(EditPolicy::AllowLiveEdits)
        );
        assert!("".parse::<EditPolicy>().is_err());
    }
}
