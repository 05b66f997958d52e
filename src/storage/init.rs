//! Store initialization and default data
//!
//! `initialize_storage` prepares a fresh data directory; `default_categories`
//! seeds the chart of accounts for each new organization.

use crate::config::paths::TaxboxPaths;
use crate::config::settings::Settings;
use crate::error::TaxboxError;
use crate::models::{BoxType, Category, OrganizationId};

/// Prepare the directory layout and write default settings if absent
///
/// Returns true when the store was freshly initialized.
pub fn initialize_storage(paths: &TaxboxPaths) -> Result<bool, TaxboxError> {
    paths.ensure_directories()?;

    if paths.settings_file().exists() {
        return Ok(false);
    }

    Settings::default().save(paths)?;
    Ok(true)
}

/// Starter categories with Thai chart-of-accounts codes
pub fn default_categories(organization_id: OrganizationId) -> Vec<Category> {
    let expense = [
        ("Cost of Goods", "5100"),
        ("Salaries", "5200"),
        ("Rent", "5300"),
        ("Utilities", "5400"),
        ("Professional Fees", "5500"),
        ("Advertising", "5600"),
        ("Transportation", "5700"),
        ("Office Supplies", "5800"),
        ("Other Expenses", "5900"),
    ];
    let income = [
        ("Sales", "4100"),
        ("Service Income", "4200"),
        ("Other Income", "4900"),
    ];

    expense
        .iter()
        .map(|(name, code)| Category::new(organization_id, *name, BoxType::Expense, *code))
        .chain(
            income
                .iter()
                .map(|(name, code)| Category::new(organization_id, *name, BoxType::Income, *code)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage_once() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(initialize_storage(&paths).unwrap());
        assert!(paths.is_initialized());
        assert!(paths.data_dir().exists());

        // Custom settings survive a second run
        let mut settings = Settings::load_or_create(&paths).unwrap();
        settings.wht_filing_day = 10;
        settings.save(&paths).unwrap();
        assert!(!initialize_storage(&paths).unwrap());
        assert_eq!(Settings::load_or_create(&paths).unwrap().wht_filing_day, 10);
    }

    #[test]
    fn test_default_categories_cover_both_types() {
        let org = OrganizationId::new();
        let categories = default_categories(org);
        assert!(categories.iter().any(|c| c.box_type == BoxType::Income));
        assert!(categories.iter().any(|c| c.name == "Rent" && c.account_code == "5300"));
        assert!(categories.iter().all(|c| c.organization_id == org && c.validate().is_ok()));
    }
}
