//! Email message

/// An email ready to be handed to the mail transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    /// The sender of the email
    pub from: String,

    /// The recipients of the email
    pub to: Vec<String>,

    /// Carbon copy recipients
    pub cc: Vec<String>,

    /// The subject of the email
    pub subject: String,

    /// The HTML body of the email
    pub html_body: String,
}
