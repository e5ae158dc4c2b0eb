use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::{collections::BTreeMap, io::Write, path::Path};

use crate::db::{month_key, Ledger, TransactionRecord};

pub const LEDGER_SHEET: &str = "Ledger";
/// Excel refuses longer sheet names
const MAX_SHEET_NAME_CHARS: usize = 31;
const LIST_SEPARATOR: &str = ", ";

/// One row of the full ledger sheet. Field order is column order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LedgerRow {
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub date: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub amount: Option<f64>,
    pub currency: String,
    pub category: String,
    pub merchant: String,
    pub memo: String,
    pub confidence: Option<f64>,
    pub keywords: String,
    pub payment_method: String,
    pub participants: String,
    #[serde(rename = "originalText")]
    pub original_text: String,
}

pub const LEDGER_COLUMNS: [&str; 13] = [
    "createdAt",
    "date",
    "type",
    "amount",
    "currency",
    "category",
    "merchant",
    "memo",
    "confidence",
    "keywords",
    "payment_method",
    "participants",
    "originalText",
];

/// Reduced row used on the per-month sheets.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub date: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub amount: Option<f64>,
    pub currency: String,
    pub category: String,
    pub merchant: String,
    pub memo: String,
}

pub const MONTHLY_COLUMNS: [&str; 7] = [
    "date", "type", "amount", "currency", "category", "merchant", "memo",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSheet {
    pub month: String,
    pub rows: Vec<MonthlyRow>,
}

impl MonthSheet {
    pub fn sheet_name(&self) -> String {
        sheet_name(&self.month)
    }
}

enum Cell<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

impl LedgerRow {
    fn from_record(record: &TransactionRecord) -> Self {
        let fields = &record.fields;
        Self {
            created_at: record.created_at.to_rfc3339(),
            date: format_date(fields.date),
            ty: fields.ty.as_str().to_string(),
            amount: fields.amount.and_then(|amount| amount.to_f64()),
            currency: fields.currency.as_str().to_string(),
            category: fields.category.clone(),
            merchant: fields.merchant.clone(),
            memo: fields.memo.clone(),
            confidence: fields.confidence,
            keywords: fields.factors.keywords.join(LIST_SEPARATOR),
            payment_method: fields.factors.payment_method.clone(),
            participants: fields.factors.participants.join(LIST_SEPARATOR),
            original_text: record.original_text.clone(),
        }
    }

    fn cells(&self) -> [Cell<'_>; 13] {
        [
            Cell::Text(&self.created_at),
            Cell::Text(&self.date),
            Cell::Text(&self.ty),
            Cell::Number(self.amount),
            Cell::Text(&self.currency),
            Cell::Text(&self.category),
            Cell::Text(&self.merchant),
            Cell::Text(&self.memo),
            Cell::Number(self.confidence),
            Cell::Text(&self.keywords),
            Cell::Text(&self.payment_method),
            Cell::Text(&self.participants),
            Cell::Text(&self.original_text),
        ]
    }
}

impl MonthlyRow {
    fn from_record(record: &TransactionRecord) -> Self {
        let fields = &record.fields;
        Self {
            date: format_date(fields.date),
            ty: fields.ty.as_str().to_string(),
            amount: fields.amount.and_then(|amount| amount.to_f64()),
            currency: fields.currency.as_str().to_string(),
            category: fields.category.clone(),
            merchant: fields.merchant.clone(),
            memo: fields.memo.clone(),
        }
    }

    fn cells(&self) -> [Cell<'_>; 7] {
        [
            Cell::Text(&self.date),
            Cell::Text(&self.ty),
            Cell::Number(self.amount),
            Cell::Text(&self.currency),
            Cell::Text(&self.category),
            Cell::Text(&self.merchant),
            Cell::Text(&self.memo),
        ]
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// All records in ledger order.
pub fn ledger_rows(ledger: &Ledger) -> Vec<LedgerRow> {
    ledger.records().iter().map(LedgerRow::from_record).collect()
}

/// One sheet per month, oldest month first. Rows keep ledger order within a month.
pub fn month_sheets(ledger: &Ledger) -> Vec<MonthSheet> {
    let mut months: BTreeMap<String, Vec<MonthlyRow>> = BTreeMap::new();
    for record in ledger.records() {
        months
            .entry(month_key(record))
            .or_default()
            .push(MonthlyRow::from_record(record));
    }
    months
        .into_iter()
        .map(|(month, rows)| MonthSheet { month, rows })
        .collect()
}

pub fn sheet_name(month: &str) -> String {
    month
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

pub fn default_file_name(today: NaiveDate, csv: bool) -> String {
    let extension = if csv { "csv" } else { "xlsx" };
    format!("talk_ledger_{}.{extension}", today.format("%Y-%m-%d"))
}

pub fn write_xlsx(ledger: &Ledger, path: &Path) -> Result<()> {
    log::info!("Writing workbook to {path:?}...");
    let header_format = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(LEDGER_SHEET)?;
    write_row(
        sheet,
        0,
        LEDGER_COLUMNS.iter().map(|column| Cell::Text(column)),
        Some(&header_format),
    )?;
    for (index, row) in ledger_rows(ledger).iter().enumerate() {
        write_row(sheet, sheet_row(index)?, row.cells(), None)?;
    }

    for month in month_sheets(ledger) {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(month.sheet_name())
            .with_context(|| format!("Invalid sheet name for month {}", month.month))?;
        write_row(
            sheet,
            0,
            MONTHLY_COLUMNS.iter().map(|column| Cell::Text(column)),
            Some(&header_format),
        )?;
        for (index, row) in month.rows.iter().enumerate() {
            write_row(sheet, sheet_row(index)?, row.cells(), None)?;
        }
    }

    workbook.save(path)?;
    log::info!("Writing workbook to {path:?}...done");
    Ok(())
}

/// Data rows start below the header.
fn sheet_row(index: usize) -> Result<u32> {
    u32::try_from(index + 1).context("Too many rows for a worksheet")
}

fn write_row<'a>(
    sheet: &mut Worksheet,
    row: u32,
    cells: impl IntoIterator<Item = Cell<'a>>,
    format: Option<&Format>,
) -> Result<()> {
    for (col, cell) in (0u16..).zip(cells) {
        match (cell, format) {
            (Cell::Text(text), Some(format)) => {
                sheet.write_string_with_format(row, col, text, format)?;
            }
            (Cell::Text(text), None) => {
                sheet.write_string(row, col, text)?;
            }
            (Cell::Number(Some(number)), _) => {
                sheet.write_number(row, col, number)?;
            }
            (Cell::Number(None), _) => {}
        }
    }
    Ok(())
}

/// The full ledger rows as CSV with a header line.
pub fn write_csv(ledger: &Ledger, writer: impl Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in ledger_rows(ledger) {
        writer.serialize(row)?;
    }
    if ledger.is_empty() {
        writer.write_record(LEDGER_COLUMNS)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv_file(ledger: &Ledger, path: &Path) -> Result<()> {
    log::info!("Writing CSV to {path:?}...");
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {path:?}"))?;
    write_csv(ledger, file)?;
    log::info!("Writing CSV to {path:?}...done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{
        testutils::{dated, record},
        TransactionType::{Expense, Income},
    };

    fn some_ledger() -> Ledger {
        let mut lunch = dated(record(Expense, Some(10_000), "식비"), 2024, 5, 10);
        lunch.fields.factors.keywords = vec!["점심".to_string(), "김치찌개".to_string()];
        lunch.fields.factors.participants = vec!["민수".to_string(), "지영".to_string()];
        lunch.fields.factors.payment_method = "카드".to_string();
        Ledger::from_records(vec![
            lunch,
            dated(record(Income, Some(3_000_000), "월급"), 2024, 4, 25),
            // No transaction date, falls back to the capture date in May 2024
            record(Expense, None, "기타"),
            dated(record(Expense, Some(4_500), "카페"), 2023, 12, 31),
        ])
    }

    #[test]
    fn ledger_rows_flatten_factors() {
        let rows = ledger_rows(&some_ledger());
        assert_eq!(4, rows.len());
        let lunch = &rows[0];
        assert_eq!("2024-05-10", lunch.date);
        assert_eq!("expense", lunch.ty);
        assert_eq!(Some(10_000.0), lunch.amount);
        assert_eq!("KRW", lunch.currency);
        assert_eq!("점심, 김치찌개", lunch.keywords);
        assert_eq!("민수, 지영", lunch.participants);
        assert_eq!("카드", lunch.payment_method);
        assert_eq!("2024-05-10T12:00:00+00:00", lunch.created_at);

        assert_eq!("", rows[2].date);
        assert_eq!(None, rows[2].amount);
    }

    #[test]
    fn month_sheets_are_ascending() {
        let sheets = month_sheets(&some_ledger());
        let months: Vec<&str> = sheets.iter().map(|sheet| sheet.month.as_str()).collect();
        assert_eq!(vec!["2023-12", "2024-04", "2024-05"], months);
        assert_eq!(2, sheets[2].rows.len());
        assert_eq!(Some(10_000.0), sheets[2].rows[0].amount);
        assert_eq!("", sheets[2].rows[1].date);
    }

    #[test]
    fn export_does_not_touch_the_ledger() {
        let ledger = some_ledger();
        let before = ledger.clone();
        let _ = ledger_rows(&ledger);
        let _ = month_sheets(&ledger);
        assert_eq!(before, ledger);
    }

    #[test]
    fn sheet_names_are_sanitized_and_truncated() {
        assert_eq!("2024-05", sheet_name("2024-05"));
        assert_eq!("a_b", sheet_name("a/b"));
        assert_eq!(31, sheet_name(&"x".repeat(40)).chars().count());
    }

    #[test]
    fn default_file_names() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!("talk_ledger_2024-05-10.xlsx", default_file_name(today, false));
        assert_eq!("talk_ledger_2024-05-10.csv", default_file_name(today, true));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut output = vec![];
        write_csv(&some_ledger(), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        let mut lines = output.lines();
        assert_eq!(Some(LEDGER_COLUMNS.join(",").as_str()), lines.next());
        let first = lines.next().unwrap();
        assert!(first.contains("\"점심, 김치찌개\""), "{first}");
        assert_eq!(4, lines.count() + 1);
    }

    #[test]
    fn csv_of_empty_ledger_is_header_only() {
        let mut output = vec![];
        write_csv(&Ledger::new_empty(), &mut output).unwrap();
        assert_eq!(
            format!("{}\n", LEDGER_COLUMNS.join(",")),
            String::from_utf8(output).unwrap()
        );
    }

    #[test]
    fn writes_workbook() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("talk_ledger.xlsx");
        write_xlsx(&some_ledger(), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn writes_workbook_for_empty_ledger() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("empty.xlsx");
        write_xlsx(&Ledger::new_empty(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn amounts_keep_fractions() {
        let mut coffee = record(Expense, None, "카페");
        coffee.fields.amount = Some(Decimal::new(1250, 2));
        let rows = ledger_rows(&Ledger::from_records(vec![coffee]));
        assert_eq!(Some(12.5), rows[0].amount);
    }
}
