//! Organization, user and membership models
//!
//! An organization is a client business that owns boxes. Users act on
//! organizations through a membership role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{OrganizationId, UserId};

/// Head-office branch code
pub const HEAD_OFFICE_BRANCH: &str = "00000";

/// A person who signs in and acts on organizations or firms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique, compared case-insensitively
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into().trim().to_lowercase(),
            name: name.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), OrganizationValidationError> {
        let email = self.email.trim();
        let valid = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid {
            return Err(OrganizationValidationError::InvalidEmail(self.email.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(OrganizationValidationError::EmptyName);
        }
        Ok(())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A client business whose accounting documents are tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,

    /// 13-digit taxpayer identification number
    pub tax_id: String,

    /// 5-digit branch code, "00000" for head office
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub address: String,

    /// Registered for VAT (can claim input VAT)
    #[serde(default)]
    pub vat_registered: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_branch() -> String {
    HEAD_OFFICE_BRANCH.to_string()
}

impl Organization {
    pub fn new(name: impl Into<String>, tax_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::new(),
            name: name.into().trim().to_string(),
            tax_id: tax_id.into().trim().to_string(),
            branch: default_branch(),
            address: String::new(),
            vat_registered: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), OrganizationValidationError> {
        if self.name.trim().is_empty() {
            return Err(OrganizationValidationError::EmptyName);
        }
        if self.name.len() > 200 {
            return Err(OrganizationValidationError::NameTooLong(self.name.len()));
        }
        validate_tax_id(&self.tax_id)?;
        validate_branch(&self.branch)?;
        Ok(())
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.tax_id)
    }
}

/// Check a Thai 13-digit tax ID including its mod-11 check digit
pub fn validate_tax_id(tax_id: &str) -> Result<(), OrganizationValidationError> {
    let digits: Vec<u32> = tax_id.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 13 || tax_id.chars().count() != 13 {
        return Err(OrganizationValidationError::InvalidTaxId(tax_id.to_string()));
    }

    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (13 - i as u32))
        .sum();
    let check = (11 - sum % 11) % 10;

    if check != digits[12] {
        return Err(OrganizationValidationError::InvalidTaxId(tax_id.to_string()));
    }
    Ok(())
}

/// Check a 5-digit branch code
pub fn validate_branch(branch: &str) -> Result<(), OrganizationValidationError> {
    if branch.len() == 5 && branch.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(OrganizationValidationError::InvalidBranch(branch.to_string()))
    }
}

/// Role a user holds inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    Accountant,
    Staff,
    Viewer,
}

impl MemberRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "accountant" => Some(Self::Accountant),
            "staff" => Some(Self::Staff),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "Owner"),
            Self::Admin => write!(f, "Admin"),
            Self::Accountant => write!(f, "Accountant"),
            Self::Staff => write!(f, "Staff"),
            Self::Viewer => write!(f, "Viewer"),
        }
    }
}

/// A user's membership in an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl OrganizationMember {
    pub fn new(organization_id: OrganizationId, user_id: UserId, role: MemberRole) -> Self {
        Self {
            organization_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Validation errors for organizations and users
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationValidationError {
    EmptyName,
    NameTooLong(usize),
    InvalidTaxId(String),
    InvalidBranch(String),
    InvalidEmail(String),
}

impl fmt::Display for OrganizationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name cannot be empty"),
            Self::NameTooLong(len) => write!(f, "Name too long ({} chars, max 200)", len),
            Self::InvalidTaxId(id) => write!(f, "Invalid 13-digit tax ID: '{}'", id),
            Self::InvalidBranch(b) => write!(f, "Branch code must be 5 digits: '{}'", b),
            Self::InvalidEmail(e) => write!(f, "Invalid e-mail address: '{}'", e),
        }
    }
}

impl std::error::Error for OrganizationValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_TAX_ID: &str = "0105536000313";

    #[test]
    fn test_new_organization_defaults() {
        let org = Organization::new("  Siam Trading  ", VALID_TAX_ID);
        assert_eq!(org.name, "Siam Trading");
        assert_eq!(org.branch, HEAD_OFFICE_BRANCH);
        assert!(!org.vat_registered);
        assert!(org.validate().is_ok());
    }

    #[test]
    fn test_tax_id_checksum() {
        assert!(validate_tax_id(VALID_TAX_ID).is_ok());
        assert!(validate_tax_id("1234567890121").is_ok());
        assert!(validate_tax_id("1234567890122").is_err());
        assert!(validate_tax_id("12345").is_err());
        assert!(validate_tax_id("123456789012a").is_err());
    }

    #[test]
    fn test_branch_validation() {
        let mut org = Organization::new("Branch Co", VALID_TAX_ID);
        org.branch = "0001".into();
        assert_eq!(
            org.validate(),
            Err(OrganizationValidationError::InvalidBranch("0001".into()))
        );
    }

    #[test]
    fn test_user_email_normalized_and_validated() {
        let user = User::new(" Somchai@Example.COM ", "Somchai");
        assert_eq!(user.email, "somchai@example.com");
        assert!(user.validate().is_ok());

        let bad = User::new("not-an-email", "X");
        assert!(matches!(
            bad.validate(),
            Err(OrganizationValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(MemberRole::parse("OWNER"), Some(MemberRole::Owner));
        assert_eq!(MemberRole::parse("staff"), Some(MemberRole::Staff));
        assert_eq!(MemberRole::parse("boss"), None);
    }

    #[test]
    fn test_role_serializes_screaming_case() {
        let json = serde_json::to_string(&MemberRole::Accountant).unwrap();
        assert_eq!(json, "\"ACCOUNTANT\"");
    }
}
