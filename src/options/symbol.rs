use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::alias::canonical_root;
use crate::constants::OCC_SYMBOL_MIN_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Parse the single-character kind flag of an OCC identifier.
    pub fn from_flag(flag: char) -> Option<Self> {
        match flag.to_ascii_uppercase() {
            'C' => Some(OptionKind::Call),
            'P' => Some(OptionKind::Put),
            _ => None,
        }
    }

    pub fn flag(&self) -> char {
        match self {
            OptionKind::Call => 'C',
            OptionKind::Put => 'P',
        }
    }

    /// Value of the chain endpoint's `contractType` parameter.
    pub fn contract_type(&self) -> &'static str {
        match self {
            OptionKind::Call => "CALL",
            OptionKind::Put => "PUT",
        }
    }

    /// Key of the expiry map holding this side of the chain.
    pub fn exp_date_map_key(&self) -> &'static str {
        match self {
            OptionKind::Call => "callExpDateMap",
            OptionKind::Put => "putExpDateMap",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// A decoded option contract. Strike is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub root: String,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
    pub strike: Decimal,
}

impl ContractKey {
    /// Expiry as the chain endpoint renders it (`YYYY-MM-DD`).
    pub fn expiry_str(&self) -> String {
        self.expiry.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.root, self.expiry_str(), self.kind, self.strike)
    }
}

/// Decode a packed OCC-style identifier, e.g. `AAPL  250620C00150000`.
///
/// Layout: root padded to 6 chars, `YYMMDD`, kind flag, strike in thousandths.
/// Years are windowed to 2000 + YY. Anything malformed yields `None`.
pub fn decode(identifier: &str) -> Option<ContractKey> {
    if identifier.len() < OCC_SYMBOL_MIN_LEN || !identifier.is_ascii() {
        return None;
    }

    let root = canonical_root(identifier[..6].trim_end());
    if root.is_empty() {
        return None;
    }

    let yymmdd = &identifier[6..12];
    if !yymmdd.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = yymmdd[..2].parse().ok()?;
    let month: u32 = yymmdd[2..4].parse().ok()?;
    let day: u32 = yymmdd[4..].parse().ok()?;
    let expiry = NaiveDate::from_ymd_opt(2000 + year, month, day)?;

    let kind = OptionKind::from_flag(identifier[12..13].chars().next()?)?;

    let strike_digits = identifier[13..].trim().trim_start_matches('0');
    if !strike_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let thousandths: i64 = if strike_digits.is_empty() {
        0
    } else {
        strike_digits.parse().ok()?
    };
    if thousandths <= 0 {
        return None;
    }
    let strike = Decimal::new(thousandths, 3).normalize();

    Some(ContractKey {
        root,
        expiry,
        kind,
        strike,
    })
}
