//! Rendering of pending messages into outbound emails

use crate::domain::{communication::mailer::OutboundEmail, dispatch::PendingMessage};

/// Font applied to the body of every email unless configured otherwise
pub const DEFAULT_FONT_FAMILY: &str = "Saysettha OT";

/// The fixed HTML document that stored body fragments are placed in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlEnvelope {
    font_family: String,
}

impl HtmlEnvelope {
    /// Create an envelope using `font_family` for the body
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
        }
    }

    /// Wrap an HTML fragment in the envelope
    pub fn wrap(&self, fragment: &str) -> String {
        format!(
            r#"<html><body style="font-family: {};">{}</body></html>"#,
            self.font_family, fragment
        )
    }
}

impl Default for HtmlEnvelope {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FAMILY)
    }
}

/// Maps stored messages to [`OutboundEmail`]s
#[derive(Clone, Debug)]
pub struct EmailBuilder {
    from: String,
    envelope: HtmlEnvelope,
}

impl EmailBuilder {
    /// Create a builder sending from `from`
    pub fn new(from: impl Into<String>, envelope: HtmlEnvelope) -> Self {
        Self {
            from: from.into(),
            envelope,
        }
    }

    /// Build the email for a pending message
    pub fn build(&self, message: &PendingMessage) -> OutboundEmail {
        OutboundEmail {
            from: self.from.clone(),
            to: message.to_addresses.clone(),
            cc: bcc_column_to_cc_header(message),
            subject: message.subject.clone(),
            html_body: self.envelope.wrap(&message.body_html),
        }
    }
}

/// Recipients stored in the `bcc` column are delivered as a visible `Cc`
/// header, not as blind copies. Existing deployments rely on this mapping.
fn bcc_column_to_cc_header(message: &PendingMessage) -> Vec<String> {
    message.bcc_addresses.clone()
}
