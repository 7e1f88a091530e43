//! Ledger amounts.
//!
//! Native amounts are integer drops. Issued-currency values are decimal
//! strings that are validated but never converted to floating point, so the
//! exact text a caller supplied is what reaches the ledger.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::ClassicAddress;
use crate::LedgerError;

/// Maximum native supply in drops (100 billion XRP).
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;

/// Significant digits an issued value can hold without being rounded.
pub const MAX_ISSUED_DIGITS: usize = 16;

/// Exponent range of a normalized issued value (mantissa in `[10^15, 10^16)`).
pub const MIN_ISSUED_EXPONENT: i32 = -96;
pub const MAX_ISSUED_EXPONENT: i32 = 80;

const MIN_MANTISSA: u64 = 1_000_000_000_000_000;

/// Characters allowed in a three-letter standard currency code.
const STANDARD_CODE_SYMBOLS: &str = "?!@#$%^&*<>(){}[]|";

// ============================================================================
// Native amounts
// ============================================================================

/// An amount of the native currency in drops (1 XRP = 1,000,000 drops).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Drops(u64);

impl Drops {
    pub fn new(drops: u64) -> Result<Self, LedgerError> {
        if drops > MAX_DROPS {
            return Err(LedgerError::InvalidAmount(format!(
                "{} drops exceeds the native supply",
                drops
            )));
        }
        Ok(Self(drops))
    }

    /// Parse an integer drop count. Decimal points are refused.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::InvalidAmount(format!(
                "'{}' is not an integer drop amount",
                s
            )));
        }
        let drops = s
            .parse::<u64>()
            .map_err(|e| LedgerError::InvalidAmount(format!("'{}': {}", s, e)))?;
        Self::new(drops)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn saturating_mul(&self, factor: u64) -> Drops {
        Drops(self.0.saturating_mul(factor).min(MAX_DROPS))
    }
}

impl std::fmt::Display for Drops {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Drops {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Drops {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Drops::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Issued values
// ============================================================================

/// A non-negative decimal value of an issued currency, kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssuedValue(String);

impl IssuedValue {
    /// Validate a decimal string such as `"0.01"`, `"10000000"` or `"1.5e3"`.
    ///
    /// Non-zero values must fit the ledger's range once normalized, roughly
    /// `1e-81` to `9.999999999999999e95`.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        let s = s.trim();
        let (digits, exponent) = decompose(s).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("'{}' is not a decimal value", s))
        })?;

        if digits.len() > MAX_ISSUED_DIGITS {
            return Err(LedgerError::InvalidAmount(format!(
                "'{}' has more than {} significant digits",
                s, MAX_ISSUED_DIGITS
            )));
        }
        if !digits.is_empty() {
            let normalized = exponent as i128 + digits.len() as i128 - MAX_ISSUED_DIGITS as i128;
            let range = MIN_ISSUED_EXPONENT as i128..=MAX_ISSUED_EXPONENT as i128;
            if !range.contains(&normalized) {
                return Err(LedgerError::InvalidAmount(format!(
                    "'{}' is outside the representable range",
                    s
                )));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// Normalized `(mantissa, exponent)` with the mantissa in `[10^15, 10^16)`
    /// and `value = mantissa * 10^exponent`. `None` for zero.
    pub fn mantissa_exponent(&self) -> Option<(u64, i32)> {
        let (digits, exponent) = decompose(&self.0)?;
        if digits.is_empty() {
            return None;
        }
        let mut mantissa: u64 = digits.parse().ok()?;
        let mut exponent = i32::try_from(exponent).ok()?;
        while mantissa < MIN_MANTISSA {
            mantissa *= 10;
            exponent -= 1;
        }
        Some((mantissa, exponent))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        decompose(&self.0)
            .map(|(digits, _)| digits.is_empty())
            .unwrap_or(true)
    }

    /// Exact decimal comparison without floating point.
    pub fn compare(&self, other: &IssuedValue) -> Ordering {
        match (decompose(&self.0), decompose(&other.0)) {
            (Some(a), Some(b)) => compare_decomposed(&a, &b),
            // Values are validated on construction.
            _ => Ordering::Equal,
        }
    }
}

impl std::fmt::Display for IssuedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IssuedValue {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IssuedValue> for String {
    fn from(value: IssuedValue) -> Self {
        value.0
    }
}

/// Split a decimal string into significant digits and a power-of-ten
/// exponent, so that `value = digits * 10^exponent`.
///
/// Leading and trailing zeros are stripped; zero yields empty digits.
fn decompose(s: &str) -> Option<(String, i64)> {
    let s = s.strip_prefix('+').unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(pos) => {
            let exp = &s[pos + 1..];
            let exp_body = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            if exp_body.is_empty() || !exp_body.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (&s[..pos], exp.parse::<i64>().ok()?)
        }
        None => (s, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let mut digits: String = format!("{}{}", int_part, frac_part);
    let mut exponent = exponent.checked_sub(frac_part.len() as i64)?;

    let trimmed_leading = digits.trim_start_matches('0');
    digits = trimmed_leading.to_string();
    while digits.ends_with('0') {
        digits.pop();
        exponent = exponent.checked_add(1)?;
    }
    if digits.is_empty() {
        exponent = 0;
    }
    Some((digits, exponent))
}

fn compare_decomposed(a: &(String, i64), b: &(String, i64)) -> Ordering {
    match (a.0.is_empty(), b.0.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    // Position of the most significant digit.
    let magnitude_a = a.0.len() as i128 + a.1 as i128;
    let magnitude_b = b.0.len() as i128 + b.1 as i128;
    if magnitude_a != magnitude_b {
        return magnitude_a.cmp(&magnitude_b);
    }

    let width = a.0.len().max(b.0.len());
    let padded_a = format!("{:0<width$}", a.0, width = width);
    let padded_b = format!("{:0<width$}", b.0, width = width);
    padded_a.cmp(&padded_b)
}

// ============================================================================
// Currency codes
// ============================================================================

/// A currency code as the ledger expects it: three-character standard codes
/// or a 40-hex-digit nonstandard code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Accepts `"USD"`, 40-hex codes, and 4–20 character ASCII names such as
    /// `"RLUSD"`, which are hex-encoded and zero-padded to 20 bytes.
    pub fn parse(code: &str) -> Result<Self, LedgerError> {
        let code = code.trim();

        if code.eq_ignore_ascii_case("XRP") {
            return Err(LedgerError::InvalidCurrency(
                "XRP is the native currency and cannot be issued".to_string(),
            ));
        }

        if code.len() == 3 {
            let valid = code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || STANDARD_CODE_SYMBOLS.contains(c));
            if !valid {
                return Err(LedgerError::InvalidCurrency(format!(
                    "'{}' contains characters not allowed in a standard code",
                    code
                )));
            }
            return Ok(Self(code.to_string()));
        }

        if code.len() == 40 && code.bytes().all(|b| b.is_ascii_hexdigit()) {
            if code.starts_with("00") {
                return Err(LedgerError::InvalidCurrency(format!(
                    "'{}' uses the reserved standard-code prefix",
                    code
                )));
            }
            return Ok(Self(code.to_ascii_uppercase()));
        }

        if (4..=20).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_graphic()) {
            let mut bytes = [0u8; 20];
            bytes[..code.len()].copy_from_slice(code.as_bytes());
            return Ok(Self(hex::encode_upper(bytes)));
        }

        Err(LedgerError::InvalidCurrency(format!(
            "'{}' is not a 3-character, 40-hex or 4-20 character ASCII code",
            code
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable form: nonstandard codes are decoded back to ASCII when
    /// they hold printable text.
    pub fn display_name(&self) -> String {
        if self.0.len() != 40 {
            return self.0.clone();
        }
        match hex::decode(&self.0) {
            Ok(bytes) => {
                let text: Vec<u8> = bytes.into_iter().take_while(|b| *b != 0).collect();
                if !text.is_empty() && text.iter().all(|b| b.is_ascii_graphic()) {
                    String::from_utf8_lossy(&text).into_owned()
                } else {
                    self.0.clone()
                }
            }
            Err(_) => self.0.clone(),
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

// ============================================================================
// Amounts
// ============================================================================

/// An issued asset: currency code plus issuing account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub currency: CurrencyCode,
    pub issuer: ClassicAddress,
}

/// An issued-currency amount in the ledger's `{currency, value, issuer}` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub currency: CurrencyCode,
    pub value: IssuedValue,
    pub issuer: ClassicAddress,
}

impl IssuedAmount {
    pub fn new(asset: &Asset, value: IssuedValue) -> Self {
        Self {
            currency: asset.currency.clone(),
            value,
            issuer: asset.issuer.clone(),
        }
    }

    pub fn asset(&self) -> Asset {
        Asset {
            currency: self.currency.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

/// Either a native drop amount (serialized as a string) or an issued amount
/// (serialized as an object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Native(Drops),
    Issued(IssuedAmount),
}

impl From<Drops> for Amount {
    fn from(drops: Drops) -> Self {
        Amount::Native(drops)
    }
}

impl From<IssuedAmount> for Amount {
    fn from(amount: IssuedAmount) -> Self {
        Amount::Issued(amount)
    }
}
