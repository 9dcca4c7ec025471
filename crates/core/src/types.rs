use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Contact details collected by the submission form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

/// Fields of [`SignatureForm`], used to attach validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Name,
    Title,
    PhoneNumber,
    Email,
    MeetingLink,
}

impl FormField {
    /// Returns the wire name used by both the HTML form and the JSON API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Title => "title",
            Self::PhoneNumber => "phoneNumber",
            Self::Email => "email",
            Self::MeetingLink => "meetingLink",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Validation failure carrying one message per offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid submission: {}", summarize(.fields))]
pub struct FormError {
    pub fields: Vec<FieldError>,
}

impl FormError {
    pub fn message_for(&self, field: FormField) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|item| item.field == field)
            .map(|item| item.message)
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|item| format!("{} {}", item.field, item.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SignatureForm {
    /// Trims every field and checks the submission rules, returning the
    /// normalized form. A blank meeting link becomes `None`.
    pub fn validate(self) -> Result<Self, FormError> {
        let form = Self {
            name: self.name.trim().to_string(),
            title: self.title.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            email: self.email.trim().to_string(),
            meeting_link: self
                .meeting_link
                .map(|link| link.trim().to_string())
                .filter(|link| !link.is_empty()),
        };

        let mut fields = Vec::new();
        for (field, value) in [
            (FormField::Name, &form.name),
            (FormField::Title, &form.title),
            (FormField::PhoneNumber, &form.phone_number),
            (FormField::Email, &form.email),
        ] {
            if value.is_empty() {
                fields.push(FieldError {
                    field,
                    message: "is required",
                });
            }
        }

        if !form.email.is_empty() && !looks_like_email(&form.email) {
            fields.push(FieldError {
                field: FormField::Email,
                message: "must be an email address",
            });
        }

        if let Some(link) = form.meeting_link.as_deref() {
            if !is_web_url(link) {
                fields.push(FieldError {
                    field: FormField::MeetingLink,
                    message: "must be an http or https URL",
                });
            }
        }

        if fields.is_empty() {
            Ok(form)
        } else {
            Err(FormError { fields })
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        _ => false,
    }
}

fn is_web_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// One persisted submission together with its rendered signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub id: String,
    pub name: String,
    pub title: String,
    pub phone_number: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(rename = "template_html")]
    pub template_html: String,
    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl SignatureRecord {
    /// Returns the form fields the record was rendered from.
    pub fn form(&self) -> SignatureForm {
        SignatureForm {
            name: self.name.clone(),
            title: self.title.clone(),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            meeting_link: self.meeting_link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SignatureForm {
        SignatureForm {
            name: "  Sam Burkan ".into(),
            title: "CEO".into(),
            phone_number: "(877) 477-9677 ext. 116".into(),
            email: "sam@itfgroup.com".into(),
            meeting_link: Some("   ".into()),
        }
    }

    #[test]
    fn validate_trims_and_drops_blank_meeting_link() {
        let form = sample().validate().expect("valid form");
        assert_eq!(form.name, "Sam Burkan");
        assert_eq!(form.meeting_link, None);
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let err = SignatureForm::default().validate().unwrap_err();
        let fields: Vec<_> = err.fields.iter().map(|item| item.field).collect();
        assert_eq!(
            fields,
            vec![
                FormField::Name,
                FormField::Title,
                FormField::PhoneNumber,
                FormField::Email
            ]
        );
        assert_eq!(err.message_for(FormField::Name), Some("is required"));
        assert!(err.to_string().contains("phoneNumber is required"));
    }

    #[test]
    fn validate_rejects_malformed_email_and_link() {
        let form = SignatureForm {
            email: "sam.itfgroup.com".into(),
            meeting_link: Some("javascript:alert(1)".into()),
            ..sample()
        };
        let err = form.validate().unwrap_err();
        assert_eq!(
            err.message_for(FormField::Email),
            Some("must be an email address")
        );
        assert_eq!(
            err.message_for(FormField::MeetingLink),
            Some("must be an http or https URL")
        );
    }

    #[test]
    fn validate_accepts_meeting_link() {
        let form = SignatureForm {
            meeting_link: Some("https://meetings.hubspot.com/jane".into()),
            ..sample()
        };
        let form = form.validate().expect("valid");
        assert_eq!(
            form.meeting_link.as_deref(),
            Some("https://meetings.hubspot.com/jane")
        );
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let form: SignatureForm = serde_json::from_value(json!({
            "name": "Jane",
            "title": "Dispatcher",
            "phoneNumber": "123-456-7890",
            "email": "jane@example.com"
        }))
        .expect("decode");
        assert_eq!(form.phone_number, "123-456-7890");
        assert_eq!(form.meeting_link, None);
    }
}
