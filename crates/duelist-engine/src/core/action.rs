use serde::{Deserialize, Serialize};

/// Inputs held by one agent for one frame.
///
/// Serialized with camel-case keys (`primaryFire`, `secondaryFire`) so recorded
/// trajectories use the same field names as the simulator's control surface.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub primary_fire: bool,
    #[serde(default)]
    pub secondary_fire: bool,
}

impl Action {
    /// No input pressed.
    pub const IDLE: Self = Self {
        up: false,
        left: false,
        down: false,
        right: false,
        primary_fire: false,
        secondary_fire: false,
    };

    /// Returns `true` if either fire button is pressed.
    #[must_use]
    pub const fn is_firing(&self) -> bool {
        self.primary_fire || self.secondary_fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_keys() {
        let action = Action {
            primary_fire: true,
            ..Action::IDLE
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["primaryFire"], true);
        assert_eq!(json["secondaryFire"], false);
    }

    #[test]
    fn test_missing_keys_default_to_released() {
        let action: Action = serde_json::from_str(r#"{"left": true}"#).unwrap();
        assert_eq!(
            action,
            Action {
                left: true,
                ..Action::IDLE
            }
        );
    }
}
