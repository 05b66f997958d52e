//! Service layer for taxbox
//!
//! The service layer provides business logic on top of the storage layer,
//! handling role checks, validation, derived fields, and cross-entity
//! operations. Every service borrows the store and acts as one user.

pub mod access;
pub mod catalog;
pub mod doc_box;
pub mod document;
pub mod export;
pub mod firm;
pub mod integration;
pub mod organization;
pub mod payment;
pub mod task;

pub use access::{AccessService, Capability};
pub use catalog::{CatalogService, NewContact};
pub use doc_box::{BoxDetail, BoxFilter, BoxService, BoxUpdate, NewBox};
pub use document::DocumentService;
pub use export::{ExportOutcome, ExportRequest, ExportService};
pub use firm::{ClientView, FirmService};
pub use integration::{IntegrationService, NewIntegration};
pub use organization::{MemberView, OrganizationService, OrganizationUpdate};
pub use payment::PaymentService;
pub use task::{NewTask, TaskService};

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::doc_box::{BoxService, NewBox};
    use super::firm::FirmService;
    use super::organization::OrganizationService;
    use crate::config::paths::TaxboxPaths;
    use crate::models::{BoxType, DocBox, FirmRole, MemberRole, Money, OrganizationId, UserId};
    use crate::storage::Storage;

    pub const TAX_ID: &str = "0105536000313";
    pub const FIRM_TAX_ID: &str = "0105555123450";

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A store with one owner and one organization
    pub struct Fixture {
        _dir: TempDir,
        pub storage: Storage,
        pub owner: UserId,
        pub org: OrganizationId,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let paths = TaxboxPaths::with_base_dir(dir.path().to_path_buf());
            let storage = Storage::open(paths).unwrap();

            let owner = OrganizationService::create_user(&storage, "owner@example.com", "Owner")
                .unwrap()
                .id;
            let org = OrganizationService::new(&storage, owner)
                .create_organization("Siam Widgets", TAX_ID, None, "Bangkok", true)
                .unwrap()
                .id;

            Self {
                _dir: dir,
                storage,
                owner,
                org,
            }
        }

        pub fn user(&self, email: &str) -> UserId {
            OrganizationService::create_user(&self.storage, email, "Test User")
                .unwrap()
                .id
        }

        /// A new user added to the fixture organization
        pub fn member(&self, email: &str, role: MemberRole) -> UserId {
            let id = self.user(email);
            self.orgs(self.owner).add_member(self.org, email, role).unwrap();
            id
        }

        pub fn orgs(&self, actor: UserId) -> OrganizationService<'_> {
            OrganizationService::new(&self.storage, actor)
        }

        /// An accountant at a new firm related to the fixture organization
        pub fn firm_accountant_with_relation(&self, active: bool) -> UserId {
            let n = self.storage.firms.firms.count().unwrap() + 1;
            let partner = self.user(&format!("partner{}@firm.co.th", n));
            let accountant_email = format!("accountant{}@firm.co.th", n);
            let accountant = self.user(&accountant_email);

            let firms = FirmService::new(&self.storage, partner);
            let firm = firms
                .create_firm(&format!("Firm {}", n), FIRM_TAX_ID)
                .unwrap();
            firms
                .add_firm_member(firm.id, &accountant_email, FirmRole::Accountant)
                .unwrap();
            let relation = firms.request_client(firm.id, self.org).unwrap();
            if active {
                FirmService::new(&self.storage, self.owner)
                    .accept_client(relation.id)
                    .unwrap();
            }
            accountant
        }

        /// A draft expense of ฿1,070.00 dated 2025-01-15
        pub fn expense_box(&self, has_vat: bool, wht_rate_bp: Option<u32>) -> DocBox {
            let mut input = NewBox::new(
                self.org,
                BoxType::Expense,
                "Printer paper",
                date(2025, 1, 15),
                Money::from_satang(107_000),
            );
            input.has_vat = has_vat;
            input.has_wht = wht_rate_bp.is_some();
            input.wht_rate_bp = wht_rate_bp;
            BoxService::new(&self.storage, self.owner)
                .create(input)
                .unwrap()
        }
    }
}
