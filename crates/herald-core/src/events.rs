//! Reporting event payloads
//!
//! The automation core only constructs these payloads; delivery is the
//! analytics collaborator's job. Payload shapes follow the in-app reporting
//! schema: an event type tag plus a JSON body carrying the schedule id,
//! message identification, campaign metadata, and resolution details.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;

use crate::message::{InAppMessage, Source};
use crate::resolution::ResolutionInfo;

/// Event type tag for message display.
pub const TYPE_DISPLAY: &str = "in_app_display";
/// Event type tag for message resolution.
pub const TYPE_RESOLUTION: &str = "in_app_resolution";

/// A reporting event emitted around the message display lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingEvent {
    event_type: &'static str,
    schedule_id: String,
    source: Source,
    occurred: DateTime<Utc>,
    campaigns: Option<Value>,
    context: Option<Value>,
    body: Value,
}

impl ReportingEvent {
    /// A message was displayed.
    pub fn display(schedule_id: impl Into<String>, message: &InAppMessage) -> Self {
        Self {
            event_type: TYPE_DISPLAY,
            schedule_id: schedule_id.into(),
            source: message.source,
            occurred: Utc::now(),
            campaigns: message.campaigns.clone(),
            context: None,
            body: json!({
                "message_name": message.name,
                "locale": message.rendered_locale,
            }),
        }
    }

    /// A displayed message reached its resolution.
    pub fn resolution(
        schedule_id: impl Into<String>,
        message: &InAppMessage,
        display_time: Duration,
        resolution: &ResolutionInfo,
    ) -> Self {
        let mut resolution_body = json!({
            "type": resolution.resolution_type.as_str(),
            "display_time": format!("{:.3}", display_time.as_secs_f64()),
        });
        if let Some(button) = &resolution.button_info {
            resolution_body["button_id"] = json!(button.id);
            if let Some(description) = &button.description {
                resolution_body["button_description"] = json!(description);
            }
        }

        Self {
            event_type: TYPE_RESOLUTION,
            schedule_id: schedule_id.into(),
            source: message.source,
            occurred: Utc::now(),
            campaigns: message.campaigns.clone(),
            context: None,
            body: json!({
                "message_name": message.name,
                "locale": message.rendered_locale,
                "resolution": resolution_body,
            }),
        }
    }

    /// A triggered schedule was interrupted before its display resolved
    /// (e.g. the process died while the message was on screen).
    pub fn interrupted(schedule_id: impl Into<String>, source: Source) -> Self {
        Self {
            event_type: TYPE_RESOLUTION,
            schedule_id: schedule_id.into(),
            source,
            occurred: Utc::now(),
            campaigns: None,
            context: None,
            body: json!({
                "resolution": { "type": "user_dismissed", "display_time": "0.000" },
            }),
        }
    }

    /// Attach reporting context (e.g. the trigger session) to the event.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach campaign metadata, replacing whatever the constructor captured.
    pub fn with_campaigns(mut self, campaigns: Option<Value>) -> Self {
        self.campaigns = campaigns;
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn occurred(&self) -> DateTime<Utc> {
        self.occurred
    }

    /// The full event payload, ready for the analytics pipeline.
    pub fn payload(&self) -> Value {
        json!({
            "type": self.event_type,
            "schedule_id": self.schedule_id,
            "source": self.source,
            "occurred": self.occurred.to_rfc3339(),
            "campaigns": self.campaigns,
            "context": self.context,
            "body": self.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DisplayContent, InAppMessage};
    use crate::resolution::{ButtonInfo, ResolutionInfo};

    fn message() -> InAppMessage {
        InAppMessage::builder(DisplayContent::Banner(json!({})))
            .name("welcome")
            .campaigns(json!({"campaign_id": "c-1"}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_display_event_payload() {
        let event = ReportingEvent::display("schedule-1", &message());
        let payload = event.payload();

        assert_eq!(payload["type"], TYPE_DISPLAY);
        assert_eq!(payload["schedule_id"], "schedule-1");
        assert_eq!(payload["campaigns"]["campaign_id"], "c-1");
        assert_eq!(payload["body"]["message_name"], "welcome");
    }

    #[test]
    fn test_resolution_event_carries_display_time() {
        let event = ReportingEvent::resolution(
            "schedule-1",
            &message(),
            Duration::from_millis(100),
            &ResolutionInfo::dismissed(),
        );
        let payload = event.payload();

        assert_eq!(payload["body"]["resolution"]["type"], "user_dismissed");
        assert_eq!(payload["body"]["resolution"]["display_time"], "0.100");
    }

    #[test]
    fn test_resolution_event_button_details() {
        let resolution = ResolutionInfo::button_pressed(ButtonInfo {
            id: "buy".into(),
            description: Some("Buy now".into()),
        });
        let event =
            ReportingEvent::resolution("s", &message(), Duration::from_secs(2), &resolution);
        let body = &event.payload()["body"]["resolution"];

        assert_eq!(body["type"], "button_click");
        assert_eq!(body["button_id"], "buy");
        assert_eq!(body["button_description"], "Buy now");
    }

    #[test]
    fn test_context_attachment() {
        let event = ReportingEvent::display("s", &message())
            .with_context(json!({"trigger_session_id": "t-9"}));
        assert_eq!(
            event.payload()["context"]["trigger_session_id"],
            "t-9"
        );
    }
}
