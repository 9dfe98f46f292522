//! Line-item table extraction from column-laid-out text.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::profile::{ColumnRole, TableSpec};
use crate::models::response::{DiscountType, LineItem};

use super::fuzzy::{contains_word, fold};
use super::processors::parse_amount;

lazy_static! {
    /// Cell separators: tabs, pipes, or runs of two or more spaces.
    static ref CELL_SEPARATOR: Regex = Regex::new(r"\t+|\s*\|\s*| {2,}").unwrap();

    /// Rows that summarize the table rather than list an item.
    static ref SUMMARY_ROW: Regex = Regex::new(
        r"(?i)^\s*(?:sous[- ]total|subtotal|total\w*|tva|tax|net\s+[àa]\s+payer|montant\s+total)\b"
    ).unwrap();
}

/// Line items found in the text and the text left once the table is cut out.
#[derive(Debug, Clone, PartialEq)]
pub struct TableExtraction {
    pub items: Vec<LineItem>,

    /// Input text without the table block.
    pub remaining_text: String,

    /// Rows that were dropped, and why.
    pub warnings: Vec<String>,
}

/// Splits a table block into typed line items.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableExtractor;

impl TableExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Find the header line, then turn the rows up to the next blank line
    /// into line items. Without a header the text is returned untouched.
    pub fn extract_table(&self, text: &str, spec: &TableSpec) -> TableExtraction {
        let lines: Vec<&str> = text.lines().collect();

        let Some((header_index, numeric_roles, has_description)) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| parse_header(line, spec).map(|(roles, desc)| (i, roles, desc)))
        else {
            debug!("No table header found");
            return TableExtraction {
                items: Vec::new(),
                remaining_text: text.to_string(),
                warnings: Vec::new(),
            };
        };

        let end = lines[header_index + 1..]
            .iter()
            .position(|l| l.trim().is_empty())
            .map(|p| header_index + 1 + p)
            .unwrap_or(lines.len());

        debug!(
            "Table header on line {} ({:?}), {} body lines",
            header_index + 1,
            numeric_roles,
            end - header_index - 1
        );

        let summary_keywords: Vec<String> = spec.summary_keywords.iter().map(|k| fold(k)).collect();
        let mut items = Vec::new();
        let mut warnings = Vec::new();

        for (offset, row) in lines[header_index + 1..end].iter().enumerate() {
            let line_number = header_index + 2 + offset;
            if is_summary_row(row, &summary_keywords) {
                debug!("Skipping summary row {}", line_number);
                continue;
            }

            let cells = split_cells(row);
            if cells.len() < spec.min_columns {
                warnings.push(format!(
                    "table row {}: {} cells, at least {} required",
                    line_number,
                    cells.len(),
                    spec.min_columns
                ));
                continue;
            }

            match parse_row(&cells, &numeric_roles, has_description) {
                Ok(item) => items.push(item),
                Err(reason) => warnings.push(format!("table row {} dropped: {}", line_number, reason)),
            }
        }

        let remaining_text = lines[..header_index]
            .iter()
            .chain(lines[end..].iter())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        TableExtraction {
            items,
            remaining_text,
            warnings,
        }
    }
}

/// Split a line into trimmed, non-empty cells.
fn split_cells(line: &str) -> Vec<&str> {
    CELL_SEPARATOR
        .split(line)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Role named by a header cell, tested in [`ColumnRole::MATCH_ORDER`].
fn match_role(cell: &str, spec: &TableSpec) -> Option<ColumnRole> {
    let folded = fold(cell);
    ColumnRole::MATCH_ORDER.into_iter().find(|role| {
        spec.keywords(*role)
            .iter()
            .any(|keyword| contains_word(&folded, &fold(keyword)))
    })
}

/// Numeric column roles, left to right, and whether a description column
/// exists, if the line names enough distinct core roles to be the header.
fn parse_header(line: &str, spec: &TableSpec) -> Option<(Vec<ColumnRole>, bool)> {
    let roles: Vec<ColumnRole> = split_cells(line)
        .into_iter()
        .filter_map(|cell| match_role(cell, spec))
        .collect();

    let core = [ColumnRole::Description, ColumnRole::Quantity, ColumnRole::UnitPrice]
        .iter()
        .filter(|role| roles.contains(role))
        .count();
    if core < spec.min_header_roles {
        return None;
    }

    let mut numeric: Vec<ColumnRole> = Vec::new();
    for role in &roles {
        if role.is_numeric() && !numeric.contains(role) {
            numeric.push(*role);
        }
    }
    Some((numeric, roles.contains(&ColumnRole::Description)))
}

fn is_summary_row(row: &str, keywords: &[String]) -> bool {
    if SUMMARY_ROW.is_match(row) {
        return true;
    }
    let folded = fold(row.trim_start());
    keywords
        .iter()
        .any(|k| folded.starts_with(k.as_str()) && contains_word(&folded, k))
}

/// Resolve numeric roles from the right-hand cells; leading leftovers form
/// the description. Optional columns (discount, then total) are given up
/// first when the row has fewer cells than the header.
fn parse_row(
    cells: &[&str],
    header_roles: &[ColumnRole],
    has_description: bool,
) -> Result<LineItem, String> {
    let mut roles = header_roles.to_vec();
    let available = cells.len().saturating_sub(usize::from(has_description));
    for optional in [ColumnRole::Discount, ColumnRole::Total] {
        if roles.len() <= available {
            break;
        }
        roles.retain(|r| *r != optional);
    }
    if roles.len() > available {
        return Err(format!("{} cells for {} numeric columns", cells.len(), roles.len()));
    }

    let split = cells.len() - roles.len();
    let description = cells[..split].join(" ");
    let value_of = |role: ColumnRole| roles.iter().position(|r| *r == role).map(|i| cells[split + i]);

    if description.is_empty() {
        return Err("no description".to_string());
    }
    let quantity = value_of(ColumnRole::Quantity)
        .and_then(parse_amount)
        .ok_or("no quantity")?;
    let unit_price = value_of(ColumnRole::UnitPrice)
        .and_then(parse_amount)
        .ok_or("no unit price")?;

    let discount = value_of(ColumnRole::Discount).and_then(parse_discount);
    let total = value_of(ColumnRole::Total)
        .and_then(parse_amount)
        .unwrap_or_else(|| LineItem::computed_total(quantity, unit_price, discount));

    Ok(LineItem {
        description,
        quantity,
        unit_price,
        total,
        discount: discount.map(|(value, _)| value),
        discount_type: discount.map(|(_, kind)| kind),
    })
}

fn parse_discount(cell: &str) -> Option<(Decimal, DiscountType)> {
    let value = parse_amount(cell)?;
    if value.is_zero() {
        return None;
    }
    let kind = if cell.contains('%') {
        DiscountType::Percentage
    } else {
        DiscountType::Amount
    };
    Some((value, kind))
}
