use tracing::{debug, info};

use crate::models::{FieldValue, RawRow, StockRecord, RECORD_COLUMNS};

/// Result of a validation pass
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Nothing was handed in
    NoInput,
    /// Validation ran; `valid` may still be empty
    Checked { valid: Vec<StockRecord>, invalid: usize },
}

impl Validation {
    /// Valid records, or `None` when there is nothing worth storing
    pub fn valid_records(&self) -> Option<&[StockRecord]> {
        match self {
            Validation::Checked { valid, .. } if !valid.is_empty() => Some(valid),
            _ => None,
        }
    }

    pub fn into_valid(self) -> Vec<StockRecord> {
        match self {
            Validation::Checked { valid, .. } => valid,
            Validation::NoInput => Vec::new(),
        }
    }

    pub fn valid_count(&self) -> usize {
        match self {
            Validation::Checked { valid, .. } => valid.len(),
            Validation::NoInput => 0,
        }
    }

    pub fn invalid_count(&self) -> usize {
        match self {
            Validation::Checked { invalid, .. } => *invalid,
            Validation::NoInput => 0,
        }
    }
}

/// Keep rows that match the persisted record shape, drop and count the rest
pub fn validate(rows: Vec<RawRow>) -> Validation {
    if rows.is_empty() {
        info!("No data to validate");
        return Validation::NoInput;
    }

    let mut valid = Vec::with_capacity(rows.len());
    let mut invalid = 0;

    for row in rows {
        match to_record(&row) {
            Some(record) => valid.push(record),
            None => {
                debug!("Dropping invalid row: {:?}", row);
                invalid += 1;
            }
        }
    }

    info!("Validated {} rows, found {} invalid rows", valid.len(), invalid);
    Validation::Checked { valid, invalid }
}

fn to_record(row: &RawRow) -> Option<StockRecord> {
    if row.len() != RECORD_COLUMNS.len() {
        return None;
    }

    let trade_date = match &row[0] {
        FieldValue::Date(date) => *date,
        _ => return None,
    };

    let symbol = match &row[1] {
        FieldValue::Text(symbol) if !symbol.trim().is_empty() => symbol.clone(),
        _ => return None,
    };

    let mut numbers = [0.0_f64; 8];
    for (slot, field) in numbers.iter_mut().zip(&row[2..]) {
        *slot = field.as_number()?;
    }

    let volume = match &row[7] {
        FieldValue::Int(v) => *v,
        FieldValue::Float(v) => v.trunc() as i64,
        _ => return None,
    };

    Some(StockRecord {
        trade_date,
        symbol,
        last_trade_price: numbers[0],
        max_price: numbers[1],
        min_price: numbers[2],
        avg_price: numbers[3],
        change_percentage: numbers[4],
        volume,
        turnover_best: numbers[6],
        total_turnover: numbers[7],
    })
}
