//! Actions a subject can request on a resource.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The operation requested in an authorization query.
///
/// Together with a resource type, an action selects the policies that can
/// grant a request (`"<type>:<action>"` index keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// All actions, in declaration order.
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    /// The lowercase wire name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::unknown_action(other)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(Action::Read.as_str(), "read");
        assert_eq!(Action::Delete.to_string(), "delete");
    }

    #[test]
    fn test_action_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Update).unwrap(), r#""update""#);

        let action: Action = serde_json::from_str(r#""create""#).unwrap();
        assert_eq!(action, Action::Create);
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("read".parse::<Action>().unwrap(), Action::Read);
        assert!(matches!(
            "write".parse::<Action>(),
            Err(CoreError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_action_rejects_unknown_in_serde() {
        let result: Result<Action, _> = serde_json::from_str(r#""append""#);
        assert!(result.is_err());
    }
}
