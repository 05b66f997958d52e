//! Monthly Tax Summary Report
//!
//! VAT and withholding tax of one organization for one month, as needed
//! for the PP.30, PND.3 and PND.53 returns. Draft boxes are left out.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    filing_deadline, BoxStatus, BoxType, ContactKind, Money, OrganizationId, TaxMonth, UserId,
    WhtForm,
};
use crate::services::{AccessService, Capability};
use crate::storage::Storage;

/// Withholding tax deducted on one return form
#[derive(Debug, Clone, Serialize)]
pub struct WhtLine {
    pub form: WhtForm,
    pub box_count: usize,
    /// Pre-VAT amount the tax was withheld from
    pub base: Money,
    pub wht: Money,
}

impl WhtLine {
    fn new(form: WhtForm) -> Self {
        Self {
            form,
            box_count: 0,
            base: Money::zero(),
            wht: Money::zero(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxSummaryReport {
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub month: TaxMonth,
    pub box_count: usize,

    /// VAT on purchases (expense boxes)
    pub input_vat: Money,
    /// VAT on sales (income boxes)
    pub output_vat: Money,
    /// Output minus input; positive means VAT payable
    pub net_vat: Money,
    pub vat_due: NaiveDate,

    /// WHT the organization withheld from payees, per form
    pub wht_lines: Vec<WhtLine>,
    pub wht_due: NaiveDate,
    /// WHT customers withheld from the organization's income
    pub wht_credited: Money,
}

impl TaxSummaryReport {
    pub fn generate(
        storage: &Storage,
        actor: UserId,
        organization_id: OrganizationId,
        month: TaxMonth,
    ) -> TaxboxResult<Self> {
        AccessService::new(storage).require(actor, organization_id, Capability::View)?;
        let organization = storage
            .organizations
            .get(organization_id)?
            .ok_or_else(|| TaxboxError::organization_not_found(organization_id.to_string()))?;

        let mut input_vat = Money::zero();
        let mut output_vat = Money::zero();
        let mut wht_credited = Money::zero();
        let mut pnd3 = WhtLine::new(WhtForm::Pnd3);
        let mut pnd53 = WhtLine::new(WhtForm::Pnd53);
        let mut box_count = 0;

        for doc_box in storage.boxes.get_by_organization(organization_id)? {
            if doc_box.status == BoxStatus::Draft || !month.contains(doc_box.document_date) {
                continue;
            }
            box_count += 1;

            match doc_box.box_type {
                BoxType::Expense => {
                    input_vat += doc_box.vat_amount;
                    if doc_box.has_wht {
                        let kind = match doc_box.contact_id {
                            Some(id) => storage.catalog.contacts.get(id)?.map(|c| c.kind),
                            None => None,
                        };
                        let line = match WhtForm::for_contact(kind.unwrap_or(ContactKind::Juristic)) {
                            WhtForm::Pnd3 => &mut pnd3,
                            WhtForm::Pnd53 => &mut pnd53,
                        };
                        line.box_count += 1;
                        line.base += doc_box.breakdown().subtotal;
                        line.wht += doc_box.wht_amount;
                    }
                }
                BoxType::Income => {
                    output_vat += doc_box.vat_amount;
                    wht_credited += doc_box.wht_amount;
                }
            }
        }

        // First day of the month; deadlines fall in the following month
        let first_day = NaiveDate::from_ymd_opt(month.year, month.month, 1)
            .ok_or_else(|| TaxboxError::Validation(format!("Invalid month {}", month)))?;
        let settings = &storage.settings;

        Ok(Self {
            organization_id,
            organization_name: organization.name,
            month,
            box_count,
            input_vat,
            output_vat,
            net_vat: output_vat - input_vat,
            vat_due: filing_deadline(first_day, settings.vat_filing_day),
            wht_lines: vec![pnd3, pnd53],
            wht_due: filing_deadline(first_day, settings.wht_filing_day),
            wht_credited,
        })
    }

    pub fn total_wht(&self) -> Money {
        self.wht_lines.iter().map(|l| l.wht).sum()
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Tax Summary: {} ({})\n",
            self.organization_name, self.month
        ));
        output.push_str(&"=".repeat(60));
        output.push('\n');
        output.push_str(&format!("Boxes:            {:>15}\n", self.box_count));
        output.push('\n');

        output.push_str(&format!("VAT (PP.30, due {})\n", self.vat_due));
        output.push_str(&format!("  Output VAT:     {:>15}\n", self.output_vat));
        output.push_str(&format!("  Input VAT:      {:>15}\n", self.input_vat));
        output.push_str(&format!("  Net VAT:        {:>15}\n", self.net_vat));
        output.push('\n');

        output.push_str(&format!("Withholding tax (due {})\n", self.wht_due));
        output.push_str(&format!(
            "  {:<8} {:>6} {:>15} {:>15}\n",
            "Form", "Boxes", "Base", "WHT"
        ));
        for line in &self.wht_lines {
            output.push_str(&format!(
                "  {:<8} {:>6} {:>15} {:>15}\n",
                line.form.to_string(),
                line.box_count,
                line.base.to_string(),
                line.wht.to_string()
            ));
        }
        output.push_str(&format!("  Total WHT:      {:>15}\n", self.total_wht()));
        output.push_str(&format!("  Credited WHT:   {:>15}\n", self.wht_credited));
        output
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> TaxboxResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["Item", "Boxes", "Base", "Amount"])?;
        csv.write_record(["Output VAT", "", "", &self.output_vat.to_plain_string()])?;
        csv.write_record(["Input VAT", "", "", &self.input_vat.to_plain_string()])?;
        csv.write_record(["Net VAT", "", "", &self.net_vat.to_plain_string()])?;
        for line in &self.wht_lines {
            csv.write_record([
                line.form.to_string(),
                line.box_count.to_string(),
                line.base.to_plain_string(),
                line.wht.to_plain_string(),
            ])?;
        }
        csv.write_record(["WHT credited", "", "", &self.wht_credited.to_plain_string()])?;
        csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;
    use crate::services::testutil::{date, Fixture};
    use crate::services::{BoxService, CatalogService, DocumentService, NewBox, NewContact};

    fn submitted(fx: &Fixture, input: NewBox) -> crate::models::DocBox {
        let boxes = BoxService::new(&fx.storage, fx.owner);
        let doc_box = boxes.create(input).unwrap();
        DocumentService::new(&fx.storage, fx.owner)
            .attach_bytes(doc_box.id, DocType::Receipt, "r.pdf", b"%PDF")
            .unwrap();
        boxes.submit(doc_box.id).unwrap()
    }

    #[test]
    fn test_monthly_vat_and_wht() {
        let fx = Fixture::new();
        let somchai = CatalogService::new(&fx.storage, fx.owner)
            .create_contact(
                fx.org,
                NewContact {
                    name: "Somchai".into(),
                    kind: ContactKind::Individual,
                    ..Default::default()
                },
            )
            .unwrap();

        // Expense ฿1,070 incl. 7% VAT with 3% WHT paid to an individual
        let mut expense = NewBox::new(
            fx.org,
            BoxType::Expense,
            "Design work",
            date(2025, 1, 10),
            Money::from_satang(107_000),
        );
        expense.has_vat = true;
        expense.has_wht = true;
        expense.wht_rate_bp = Some(300);
        expense.contact_id = Some(somchai.id);
        submitted(&fx, expense);

        // Income ฿2,140 incl. VAT
        let mut income = NewBox::new(
            fx.org,
            BoxType::Income,
            "Widget sale",
            date(2025, 1, 20),
            Money::from_satang(214_000),
        );
        income.has_vat = true;
        submitted(&fx, income);

        // Draft and other-month boxes are ignored
        fx.expense_box(true, None);
        let mut february = NewBox::new(
            fx.org,
            BoxType::Income,
            "February sale",
            date(2025, 2, 3),
            Money::from_satang(107_000),
        );
        february.has_vat = true;
        submitted(&fx, february);

        let report = TaxSummaryReport::generate(
            &fx.storage,
            fx.owner,
            fx.org,
            TaxMonth::parse("2025-01").unwrap(),
        )
        .unwrap();

        assert_eq!(report.box_count, 2);
        assert_eq!(report.input_vat.satang(), 7_000);
        assert_eq!(report.output_vat.satang(), 14_000);
        assert_eq!(report.net_vat.satang(), 7_000);
        assert_eq!(report.wht_lines[0].form, WhtForm::Pnd3);
        assert_eq!(report.wht_lines[0].box_count, 1);
        assert_eq!(report.wht_lines[0].base.satang(), 100_000);
        assert_eq!(report.wht_lines[0].wht.satang(), 3_000);
        assert_eq!(report.wht_lines[1].box_count, 0);
        assert_eq!(report.vat_due, date(2025, 2, 15));
        assert_eq!(report.wht_due, date(2025, 2, 7));

        assert!(report.format_terminal().contains("PND.3"));
        let mut out = Vec::new();
        report.export_csv(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Net VAT,,,70.00"));
    }

    #[test]
    fn test_contact_less_wht_goes_to_pnd53() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, Some(300));
        DocumentService::new(&fx.storage, fx.owner)
            .attach_bytes(doc_box.id, DocType::Receipt, "r.pdf", b"%PDF")
            .unwrap();
        BoxService::new(&fx.storage, fx.owner).submit(doc_box.id).unwrap();

        let report = TaxSummaryReport::generate(
            &fx.storage,
            fx.owner,
            fx.org,
            TaxMonth::parse("2025-01").unwrap(),
        )
        .unwrap();
        assert_eq!(report.wht_lines[1].form, WhtForm::Pnd53);
        assert_eq!(report.wht_lines[1].box_count, 1);
        assert_eq!(report.total_wht().satang(), 3_210);
    }
}
