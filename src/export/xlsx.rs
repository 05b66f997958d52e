//! Excel writer: one worksheet with a bold header row and numeric money cells

use rust_xlsxwriter::{Format, Workbook};

use crate::error::TaxboxResult;
use crate::models::ExportTarget;

use super::columns::headers;
use super::record::{Cell, ExportRow};

const SHEET_NAME: &str = "Export";

pub fn write_xlsx(target: ExportTarget, rows: &[ExportRow]) -> TaxboxResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in headers(target).iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
        sheet.set_column_width(col, 16)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (index, row) in rows.iter().enumerate() {
        let r = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r, col, s.as_str())?;
                }
                Cell::Money(m) => {
                    sheet.write_number_with_format(r, col, m.as_baht_f64(), &money_format)?;
                }
                Cell::Integer(n) => {
                    sheet.write_number(r, col, *n as f64)?;
                }
                Cell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;

    #[test]
    fn test_xlsx_is_a_zip_container() {
        let target = ExportTarget::FlowAccount;
        let mut row: ExportRow = vec![Cell::Empty; headers(target).len()];
        row[0] = Cell::Text("2025-01-15".into());
        row[7] = Cell::Money(Money::from_satang(100_000));

        let bytes = write_xlsx(target, &[row]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
