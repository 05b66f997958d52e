//! Per-organization reference data: categories, contacts and cost centers

use serde::{Deserialize, Serialize};
use std::fmt;

use super::doc_box::BoxType;
use super::ids::{CategoryId, ContactId, CostCenterId, OrganizationId};

/// Chart-of-accounts bucket a box is booked against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub box_type: BoxType,
    /// Ledger account code used by bookkeeping exports
    #[serde(default)]
    pub account_code: String,
    #[serde(default)]
    pub archived: bool,
}

impl Category {
    pub fn new(
        organization_id: OrganizationId,
        name: impl Into<String>,
        box_type: BoxType,
        account_code: impl Into<String>,
    ) -> Self {
        Self {
            id: CategoryId::new(),
            organization_id,
            name: name.into().trim().to_string(),
            box_type,
            account_code: account_code.into().trim().to_string(),
            archived: false,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.name.is_empty() {
            return Err(CatalogValidationError::EmptyName);
        }
        if !self.account_code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CatalogValidationError::InvalidCode(self.account_code.clone()));
        }
        Ok(())
    }
}

/// Whether a contact is a natural person or a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactKind {
    Individual,
    #[default]
    Juristic,
}

impl ContactKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "individual" | "person" => Some(Self::Individual),
            "juristic" | "company" => Some(Self::Juristic),
            _ => None,
        }
    }
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual => write!(f, "Individual"),
            Self::Juristic => write!(f, "Juristic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactRole {
    #[default]
    Vendor,
    Customer,
    Both,
}

impl ContactRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vendor" | "supplier" => Some(Self::Vendor),
            "customer" => Some(Self::Customer),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// A vendor or customer named on documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub tax_id: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub kind: ContactKind,
    #[serde(default)]
    pub role: ContactRole,
    /// WHT rate pre-filled on new boxes for this contact
    pub default_wht_rate_bp: Option<u32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl Contact {
    pub fn new(organization_id: OrganizationId, name: impl Into<String>, kind: ContactKind) -> Self {
        Self {
            id: ContactId::new(),
            organization_id,
            name: name.into().trim().to_string(),
            tax_id: None,
            branch: None,
            kind,
            role: ContactRole::default(),
            default_wht_rate_bp: None,
            email: None,
            phone: None,
            archived: false,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.name.is_empty() {
            return Err(CatalogValidationError::EmptyName);
        }
        if let Some(tax_id) = &self.tax_id {
            super::organization::validate_tax_id(tax_id)
                .map_err(|_| CatalogValidationError::InvalidTaxId(tax_id.clone()))?;
        }
        if let Some(rate) = self.default_wht_rate_bp {
            if rate > 10_000 {
                return Err(CatalogValidationError::InvalidRate(rate));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: CostCenterId,
    pub organization_id: OrganizationId,
    /// Unique per organization
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

impl CostCenter {
    pub fn new(
        organization_id: OrganizationId,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: CostCenterId::new(),
            organization_id,
            code: code.into().trim().to_uppercase(),
            name: name.into().trim().to_string(),
            archived: false,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.name.is_empty() {
            return Err(CatalogValidationError::EmptyName);
        }
        if self.code.is_empty() || !self.code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(CatalogValidationError::InvalidCode(self.code.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    EmptyName,
    InvalidCode(String),
    InvalidTaxId(String),
    InvalidRate(u32),
}

impl fmt::Display for CatalogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name cannot be empty"),
            Self::InvalidCode(code) => write!(f, "Invalid code: '{}'", code),
            Self::InvalidTaxId(id) => write!(f, "Invalid 13-digit tax ID: '{}'", id),
            Self::InvalidRate(rate) => write!(f, "Rate out of range: {} bp", rate),
        }
    }
}

impl std::error::Error for CatalogValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_validation() {
        let org = OrganizationId::new();
        let cat = Category::new(org, "Office Rent", BoxType::Expense, "5310");
        assert!(cat.validate().is_ok());

        let bad = Category::new(org, "Bad", BoxType::Expense, "53 10");
        assert!(matches!(
            bad.validate(),
            Err(CatalogValidationError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_contact_tax_id_checked() {
        let mut contact = Contact::new(OrganizationId::new(), "Somsak", ContactKind::Individual);
        assert!(contact.validate().is_ok());
        contact.tax_id = Some("1234567890122".into());
        assert!(matches!(
            contact.validate(),
            Err(CatalogValidationError::InvalidTaxId(_))
        ));
    }

    #[test]
    fn test_cost_center_code_uppercased() {
        let cc = CostCenter::new(OrganizationId::new(), " hq-01 ", "Head office");
        assert_eq!(cc.code, "HQ-01");
        assert!(cc.validate().is_ok());
    }

    #[test]
    fn test_contact_kind_parse() {
        assert_eq!(ContactKind::parse("company"), Some(ContactKind::Juristic));
        assert_eq!(ContactKind::parse("Individual"), Some(ContactKind::Individual));
        assert_eq!(ContactRole::parse("supplier"), Some(ContactRole::Vendor));
    }
}
