//! Display resolution types
//!
//! A resolution is the terminal user interaction outcome for a displayed
//! message: a button press, a click on the message body, a user dismiss, or
//! a timeout.

use serde::{Deserialize, Serialize};

/// Button identity carried by a button-click resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonInfo {
    /// Button identifier, as defined in the message content.
    pub id: String,

    /// Optional human-readable button description, for reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Resolution type tags, serialized into resolution reporting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    ButtonClick,
    MessageClick,
    UserDismissed,
    TimedOut,
}

impl ResolutionType {
    /// Wire name of the resolution type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionType::ButtonClick => "button_click",
            ResolutionType::MessageClick => "message_click",
            ResolutionType::UserDismissed => "user_dismissed",
            ResolutionType::TimedOut => "timed_out",
        }
    }
}

/// Why a displayed message went away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionInfo {
    #[serde(rename = "type")]
    pub resolution_type: ResolutionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_info: Option<ButtonInfo>,
}

impl ResolutionInfo {
    /// The user dismissed the message.
    pub fn dismissed() -> Self {
        Self {
            resolution_type: ResolutionType::UserDismissed,
            button_info: None,
        }
    }

    /// The message display timed out.
    pub fn timed_out() -> Self {
        Self {
            resolution_type: ResolutionType::TimedOut,
            button_info: None,
        }
    }

    /// The user clicked the message body.
    pub fn message_clicked() -> Self {
        Self {
            resolution_type: ResolutionType::MessageClick,
            button_info: None,
        }
    }

    /// The user pressed a button.
    pub fn button_pressed(button_info: ButtonInfo) -> Self {
        Self {
            resolution_type: ResolutionType::ButtonClick,
            button_info: Some(button_info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(
            ResolutionInfo::dismissed().resolution_type,
            ResolutionType::UserDismissed
        );
        assert_eq!(
            ResolutionInfo::timed_out().resolution_type,
            ResolutionType::TimedOut
        );

        let button = ResolutionInfo::button_pressed(ButtonInfo {
            id: "ok".into(),
            description: Some("Dismiss".into()),
        });
        assert_eq!(button.resolution_type, ResolutionType::ButtonClick);
        assert_eq!(button.button_info.unwrap().id, "ok");
    }

    #[test]
    fn test_type_wire_names() {
        assert_eq!(ResolutionType::UserDismissed.as_str(), "user_dismissed");
        assert_eq!(ResolutionType::ButtonClick.as_str(), "button_click");
    }
}
