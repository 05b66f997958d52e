//! Shared state and result types for CLI handlers

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{Money, NotificationEvent, Organization, OrganizationId, User, UserId};
use crate::services::OrganizationService;
use crate::storage::Storage;

/// Everything a command needs: the store, who is acting and the selected organization
pub struct CliContext<'a> {
    pub storage: &'a Storage,
    user: Option<String>,
    org: Option<String>,
}

impl<'a> CliContext<'a> {
    /// `user` falls back to the configured default user
    pub fn new(storage: &'a Storage, user: Option<String>, org: Option<String>) -> Self {
        let user = user.or_else(|| storage.settings.default_user.clone());
        Self { storage, user, org }
    }

    pub fn user(&self) -> TaxboxResult<User> {
        let identifier = self.user.as_deref().ok_or_else(|| {
            TaxboxError::Config(
                "No acting user. Pass --user, set TAXBOX_USER, or run 'taxbox config default-user'"
                    .into(),
            )
        })?;
        OrganizationService::find_user(self.storage, identifier)
    }

    pub fn actor(&self) -> TaxboxResult<UserId> {
        Ok(self.user()?.id)
    }

    /// The organization named by `--org`, or the actor's only organization
    pub fn organization(&self) -> TaxboxResult<Organization> {
        let actor = self.actor()?;
        let service = OrganizationService::new(self.storage, actor);
        match self.org.as_deref() {
            Some(identifier) => {
                let org = service.find_organization(identifier)?;
                service.get(org.id)
            }
            None => {
                let mut orgs = service.list_for_user()?;
                match orgs.len() {
                    1 => Ok(orgs.remove(0).0),
                    0 => Err(TaxboxError::Validation(
                        "You do not belong to any organization yet".into(),
                    )),
                    _ => Err(TaxboxError::Validation(
                        "You belong to several organizations; choose one with --org".into(),
                    )),
                }
            }
        }
    }

    /// The organization named by `--org`, without checking the actor's access
    ///
    /// Firm commands act on organizations the firm does not serve yet.
    pub fn named_organization(&self) -> TaxboxResult<Organization> {
        let identifier = self.org.as_deref().ok_or_else(|| {
            TaxboxError::Validation("Choose the client organization with --org".into())
        })?;
        OrganizationService::new(self.storage, self.actor()?).find_organization(identifier)
    }

    pub fn organization_id(&self) -> TaxboxResult<OrganizationId> {
        Ok(self.organization()?.id)
    }
}

/// A notification to send once the command has succeeded
#[derive(Debug, Clone)]
pub struct Notice {
    pub organization_id: OrganizationId,
    pub event: NotificationEvent,
    pub message: String,
}

/// What a handler produced: human text, machine data and an optional notice
#[derive(Debug, Default)]
pub struct Outcome {
    pub text: String,
    pub data: Option<Value>,
    pub notice: Option<Notice>,
}

impl Outcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: &T) -> TaxboxResult<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    pub fn notify(
        mut self,
        organization_id: OrganizationId,
        event: NotificationEvent,
        message: impl Into<String>,
    ) -> Self {
        self.notice = Some(Notice {
            organization_id,
            event,
            message: message.into(),
        });
        self
    }
}

/// The `{ success, data?, error? }` object printed by `--json`
#[derive(Debug, Serialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: &TaxboxError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

pub fn parse_date(s: &str) -> TaxboxResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        TaxboxError::Validation(format!("Invalid date: '{}'. Use YYYY-MM-DD", s))
    })
}

pub fn parse_money(s: &str) -> TaxboxResult<Money> {
    Money::parse(s).map_err(|e| {
        TaxboxError::Validation(format!(
            "Invalid amount: '{}'. Use a format like '1070.00'. Error: {}",
            s, e
        ))
    })
}

pub fn parse_rate_arg(s: &str) -> TaxboxResult<u32> {
    crate::models::parse_rate(s).ok_or_else(|| {
        TaxboxError::Validation(format!("Invalid rate: '{}'. Use a percentage like '3'", s))
    })
}

/// Parse an enum flag with the model's `parse`, naming the valid values on failure
pub fn parse_choice<T>(
    value: &str,
    what: &str,
    valid: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> TaxboxResult<T> {
    parse(value).ok_or_else(|| {
        TaxboxError::Validation(format!(
            "Invalid {}: '{}'. Valid values: {}",
            what, value, valid
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_result_shape() {
        let ok = serde_json::to_value(CommandResult::ok(None)).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true }));

        let err = TaxboxError::box_not_found("B-2025-0001");
        let failed = serde_json::to_value(CommandResult::failed(&err)).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "Box not found: B-2025-0001");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_date("2025-01-15").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert!(parse_date("15/01/2025").unwrap_err().is_validation());
        assert_eq!(parse_money("1070").unwrap(), Money::from_satang(107_000));
        assert!(parse_choice("bogus", "type", "a, b", |_| None::<u8>)
            .unwrap_err()
            .to_string()
            .contains("Valid values: a, b"));
    }
}
