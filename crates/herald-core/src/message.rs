//! In-app message model
//!
//! An [`InAppMessage`] is an immutable value describing one message to show:
//! what to render ([`DisplayContent`]), where the definition came from
//! ([`Source`]), whether display events should be reported, and opaque
//! campaign metadata for attribution. Messages are built once by the
//! scheduling layer and may be transformed once more by a registered
//! extender before preparation begins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum length of a message name, in characters.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Where a message definition originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Scheduled directly by the application.
    AppDefined,
    /// Delivered through remote configuration.
    RemoteData,
    /// Converted from a legacy push payload.
    LegacyPush,
}

/// How the message wants to be gated for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBehavior {
    /// Coordinated display with the shared display interval.
    #[default]
    Default,
    /// Display as soon as the schedule is ready, bypassing the shared gate.
    Immediate,
}

/// Display-content variants. Payloads are opaque to the automation core;
/// only the concrete rendering adapters interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "display_type", content = "display", rename_all = "snake_case")]
pub enum DisplayContent {
    Banner(Value),
    Fullscreen(Value),
    Modal(Value),
    Html(Value),
    Layout(Value),
    Custom(Value),
}

impl DisplayContent {
    /// The discriminant of this content, used as the adapter-registry key.
    pub fn display_type(&self) -> DisplayType {
        match self {
            DisplayContent::Banner(_) => DisplayType::Banner,
            DisplayContent::Fullscreen(_) => DisplayType::Fullscreen,
            DisplayContent::Modal(_) => DisplayType::Modal,
            DisplayContent::Html(_) => DisplayType::Html,
            DisplayContent::Layout(_) => DisplayType::Layout,
            DisplayContent::Custom(_) => DisplayType::Custom,
        }
    }
}

/// Discriminant of [`DisplayContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    Banner,
    Fullscreen,
    Modal,
    Html,
    Layout,
    Custom,
}

/// An immutable in-app message.
///
/// Equality is structural. Use [`InAppMessage::builder`] to construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppMessage {
    /// Display content variant.
    pub content: DisplayContent,

    /// Optional message name, for reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Where the message definition came from.
    pub source: Source,

    /// Display gating behavior.
    #[serde(default)]
    pub display_behavior: DisplayBehavior,

    /// Named actions to run when the message display finishes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub actions: HashMap<String, Value>,

    /// Whether display/resolution events should be reported.
    #[serde(default = "default_reporting_enabled")]
    pub reporting_enabled: bool,

    /// Opaque campaign metadata, forwarded to reporting events verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaigns: Option<Value>,

    /// Locale the message content was rendered in, if localized remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_locale: Option<HashMap<String, String>>,
}

fn default_reporting_enabled() -> bool {
    true
}

impl InAppMessage {
    /// Start building a message with the given content.
    pub fn builder(content: DisplayContent) -> InAppMessageBuilder {
        InAppMessageBuilder {
            content,
            name: None,
            source: Source::AppDefined,
            display_behavior: DisplayBehavior::Default,
            actions: HashMap::new(),
            reporting_enabled: true,
            campaigns: None,
            rendered_locale: None,
        }
    }

    /// The display type of the message content.
    pub fn display_type(&self) -> DisplayType {
        self.content.display_type()
    }
}

/// Builder for [`InAppMessage`].
#[derive(Debug, Clone)]
pub struct InAppMessageBuilder {
    content: DisplayContent,
    name: Option<String>,
    source: Source,
    display_behavior: DisplayBehavior,
    actions: HashMap<String, Value>,
    reporting_enabled: bool,
    campaigns: Option<Value>,
    rendered_locale: Option<HashMap<String, String>>,
}

impl InAppMessageBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn display_behavior(mut self, behavior: DisplayBehavior) -> Self {
        self.display_behavior = behavior;
        self
    }

    pub fn action(mut self, name: impl Into<String>, value: Value) -> Self {
        self.actions.insert(name.into(), value);
        self
    }

    pub fn actions(mut self, actions: HashMap<String, Value>) -> Self {
        self.actions = actions;
        self
    }

    pub fn reporting_enabled(mut self, enabled: bool) -> Self {
        self.reporting_enabled = enabled;
        self
    }

    pub fn campaigns(mut self, campaigns: Value) -> Self {
        self.campaigns = Some(campaigns);
        self
    }

    pub fn rendered_locale(mut self, locale: HashMap<String, String>) -> Self {
        self.rendered_locale = Some(locale);
        self
    }

    /// Build the message, validating the name length.
    pub fn build(self) -> Result<InAppMessage> {
        if let Some(name) = &self.name {
            if name.chars().count() > MAX_NAME_LENGTH {
                return Err(Error::invalid_message(format!(
                    "Message name exceeds {MAX_NAME_LENGTH} characters"
                )));
            }
        }

        Ok(InAppMessage {
            content: self.content,
            name: self.name,
            source: self.source,
            display_behavior: self.display_behavior,
            actions: self.actions,
            reporting_enabled: self.reporting_enabled,
            campaigns: self.campaigns,
            rendered_locale: self.rendered_locale,
        })
    }
}
