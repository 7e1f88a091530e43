//! Binary transaction format.
//!
//! Transactions are signed and submitted as canonical binary: fields sorted
//! by `(type code, field code)`, each behind a one to three byte header. Only
//! the fields the payment flows produce are known here; anything else is a
//! serialization error rather than a silently dropped field.

use serde_json::{Map, Value};

use common::address::ACCOUNT_ID_LEN;
use common::amount::MAX_DROPS;
use common::{AccountId, ClassicAddress, CurrencyCode, IssuedValue, LedgerError};

use super::keys::sha512_half;

/// Prefix of single-signature signing data (`STX\0`).
pub const SIGN_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];
/// Prefix of multisignature signing data (`SMT\0`).
pub const MULTISIGN_PREFIX: [u8; 4] = [0x53, 0x4D, 0x54, 0x00];
/// Prefix hashed with a signed blob to form its transaction ID (`TXN\0`).
pub const TRANSACTION_ID_PREFIX: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

const TYPE_UINT16: u8 = 1;
const TYPE_UINT32: u8 = 2;
const TYPE_AMOUNT: u8 = 6;
const TYPE_BLOB: u8 = 7;
const TYPE_ACCOUNT: u8 = 8;
const TYPE_OBJECT: u8 = 14;
const TYPE_ARRAY: u8 = 15;

const OBJECT_END: u8 = 0xE1;
const ARRAY_END: u8 = 0xF1;

const AMOUNT_NOT_NATIVE: u64 = 0x8000_0000_0000_0000;
const AMOUNT_POSITIVE: u64 = 0x4000_0000_0000_0000;
const MANTISSA_MASK: u64 = (1 << 54) - 1;
const EXPONENT_BIAS: i32 = 97;

struct Field {
    name: &'static str,
    type_code: u8,
    nth: u8,
    signing: bool,
}

const fn field(name: &'static str, type_code: u8, nth: u8) -> Field {
    Field {
        name,
        type_code,
        nth,
        signing: true,
    }
}

const FIELDS: &[Field] = &[
    field("TransactionType", TYPE_UINT16, 2),
    field("SignerWeight", TYPE_UINT16, 3),
    field("Flags", TYPE_UINT32, 2),
    field("SourceTag", TYPE_UINT32, 3),
    field("Sequence", TYPE_UINT32, 4),
    field("Expiration", TYPE_UINT32, 10),
    field("DestinationTag", TYPE_UINT32, 14),
    field("OfferSequence", TYPE_UINT32, 25),
    field("LastLedgerSequence", TYPE_UINT32, 27),
    field("SignerQuorum", TYPE_UINT32, 35),
    field("Amount", TYPE_AMOUNT, 1),
    field("LimitAmount", TYPE_AMOUNT, 3),
    field("TakerPays", TYPE_AMOUNT, 4),
    field("TakerGets", TYPE_AMOUNT, 5),
    field("Fee", TYPE_AMOUNT, 8),
    field("SendMax", TYPE_AMOUNT, 9),
    field("DeliverMin", TYPE_AMOUNT, 10),
    field("SigningPubKey", TYPE_BLOB, 3),
    Field {
        name: "TxnSignature",
        type_code: TYPE_BLOB,
        nth: 4,
        signing: false,
    },
    field("Account", TYPE_ACCOUNT, 1),
    field("Destination", TYPE_ACCOUNT, 3),
    field("SignerEntry", TYPE_OBJECT, 11),
    field("Signer", TYPE_OBJECT, 16),
    Field {
        name: "Signers",
        type_code: TYPE_ARRAY,
        nth: 3,
        signing: false,
    },
    field("SignerEntries", TYPE_ARRAY, 4),
];

const TRANSACTION_TYPES: &[(&str, u16)] = &[
    ("Payment", 0),
    ("OfferCreate", 7),
    ("SignerListSet", 12),
    ("TrustSet", 20),
];

fn field_by_name(name: &str) -> Result<&'static Field, LedgerError> {
    FIELDS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| LedgerError::Serialization(format!("unsupported field {}", name)))
}

fn field_by_code(type_code: u8, nth: u8) -> Result<&'static Field, LedgerError> {
    FIELDS
        .iter()
        .find(|f| f.type_code == type_code && f.nth == nth)
        .ok_or_else(|| {
            LedgerError::Serialization(format!("unknown field code ({}, {})", type_code, nth))
        })
}

fn err(msg: impl Into<String>) -> LedgerError {
    LedgerError::Serialization(msg.into())
}

// ============================================================================
// Public API
// ============================================================================

/// Canonical binary form of a complete transaction.
pub fn encode(tx_json: &Value) -> Result<Vec<u8>, LedgerError> {
    let mut out = Vec::new();
    encode_object(tx_json, false, &mut out)?;
    Ok(out)
}

/// Bytes a single signer signs: the prefix plus every signing field.
pub fn signing_data(tx_json: &Value) -> Result<Vec<u8>, LedgerError> {
    let mut out = SIGN_PREFIX.to_vec();
    encode_object(tx_json, true, &mut out)?;
    Ok(out)
}

/// Bytes one multisig participant signs; the signer's account ID is appended
/// so that a signature cannot be replayed for another signer.
pub fn multisigning_data(tx_json: &Value, signer: &AccountId) -> Result<Vec<u8>, LedgerError> {
    let mut out = MULTISIGN_PREFIX.to_vec();
    encode_object(tx_json, true, &mut out)?;
    out.extend_from_slice(&signer.0);
    Ok(out)
}

/// Transaction ID of a signed blob, upper-case hex.
pub fn transaction_hash(blob: &[u8]) -> String {
    let mut data = Vec::with_capacity(TRANSACTION_ID_PREFIX.len() + blob.len());
    data.extend_from_slice(&TRANSACTION_ID_PREFIX);
    data.extend_from_slice(blob);
    hex::encode_upper(sha512_half(&data))
}

/// JSON form of a binary transaction.
pub fn decode(blob: &[u8]) -> Result<Value, LedgerError> {
    let mut reader = Reader { data: blob, pos: 0 };
    let mut object = Map::new();
    while !reader.is_empty() {
        let (name, value) = reader.read_field()?;
        object.insert(name.to_string(), value);
    }
    Ok(Value::Object(object))
}

// ============================================================================
// Encoding
// ============================================================================

fn encode_object(value: &Value, signing_only: bool, out: &mut Vec<u8>) -> Result<(), LedgerError> {
    let object = value
        .as_object()
        .ok_or_else(|| err("transaction must be a JSON object"))?;

    let mut fields = Vec::with_capacity(object.len());
    for (name, value) in object {
        // Computed by the ledger, never part of the binary form.
        if name == "hash" {
            continue;
        }
        let field = field_by_name(name)?;
        if signing_only && !field.signing {
            continue;
        }
        fields.push((field, value));
    }
    fields.sort_by_key(|(f, _)| (f.type_code, f.nth));

    for (field, value) in fields {
        write_header(field.type_code, field.nth, out);
        encode_value(field, value, out)?;
    }
    Ok(())
}

fn write_header(type_code: u8, nth: u8, out: &mut Vec<u8>) {
    match (type_code < 16, nth < 16) {
        (true, true) => out.push(type_code << 4 | nth),
        (false, true) => out.extend_from_slice(&[nth, type_code]),
        (true, false) => out.extend_from_slice(&[type_code << 4, nth]),
        (false, false) => out.extend_from_slice(&[0, type_code, nth]),
    }
}

fn encode_value(field: &Field, value: &Value, out: &mut Vec<u8>) -> Result<(), LedgerError> {
    match field.type_code {
        TYPE_UINT16 => {
            let n = if field.name == "TransactionType" {
                let name = value
                    .as_str()
                    .ok_or_else(|| err("TransactionType must be a string"))?;
                TRANSACTION_TYPES
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, code)| *code)
                    .ok_or_else(|| err(format!("unsupported transaction type {}", name)))?
            } else {
                value
                    .as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| err(format!("{} must be a 16-bit integer", field.name)))?
            };
            out.extend_from_slice(&n.to_be_bytes());
        }
        TYPE_UINT32 => {
            let n = value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| err(format!("{} must be a 32-bit integer", field.name)))?;
            out.extend_from_slice(&n.to_be_bytes());
        }
        TYPE_AMOUNT => encode_amount(field.name, value, out)?,
        TYPE_BLOB => {
            let text = value
                .as_str()
                .ok_or_else(|| err(format!("{} must be a hex string", field.name)))?;
            let bytes =
                hex::decode(text).map_err(|e| err(format!("{}: {}", field.name, e)))?;
            write_length(bytes.len(), out)?;
            out.extend_from_slice(&bytes);
        }
        TYPE_ACCOUNT => {
            let id = account_value(field.name, value)?;
            write_length(ACCOUNT_ID_LEN, out)?;
            out.extend_from_slice(&id.0);
        }
        TYPE_OBJECT => {
            encode_object(value, false, out)?;
            out.push(OBJECT_END);
        }
        TYPE_ARRAY => {
            let items = value
                .as_array()
                .ok_or_else(|| err(format!("{} must be an array", field.name)))?;
            for item in items {
                // Each element is a single-key wrapper such as {"Signer": {...}}.
                let (name, inner) = item
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .and_then(|o| o.iter().next())
                    .ok_or_else(|| err(format!("malformed {} element", field.name)))?;
                let inner_field = field_by_name(name)?;
                if inner_field.type_code != TYPE_OBJECT {
                    return Err(err(format!("{} cannot hold {}", field.name, name)));
                }
                write_header(inner_field.type_code, inner_field.nth, out);
                encode_value(inner_field, inner, out)?;
            }
            out.push(ARRAY_END);
        }
        other => return Err(err(format!("unsupported type code {}", other))),
    }
    Ok(())
}

fn account_value(name: &str, value: &Value) -> Result<AccountId, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| err(format!("{} must be an address", name)))?;
    ClassicAddress::parse(text)
        .map(|a| a.account_id())
        .map_err(|e| err(format!("{}: {}", name, e)))
}

fn encode_amount(name: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), LedgerError> {
    if let Some(text) = value.as_str() {
        let drops: u64 = text
            .parse()
            .ok()
            .filter(|d| *d <= MAX_DROPS)
            .ok_or_else(|| err(format!("{}: '{}' is not a drop amount", name, text)))?;
        out.extend_from_slice(&(AMOUNT_POSITIVE | drops).to_be_bytes());
        return Ok(());
    }

    let text_field = |key: &str| {
        value[key]
            .as_str()
            .ok_or_else(|| err(format!("{} is missing {}", name, key)))
    };
    let amount = IssuedValue::parse(text_field("value")?)
        .map_err(|e| err(format!("{}: {}", name, e)))?;
    let currency = CurrencyCode::parse(text_field("currency")?)
        .map_err(|e| err(format!("{}: {}", name, e)))?;
    let issuer = account_value(name, &value["issuer"])?;

    let bits = match amount.mantissa_exponent() {
        None => AMOUNT_NOT_NATIVE,
        Some((mantissa, exponent)) => {
            let biased = u64::try_from(exponent + EXPONENT_BIAS)
                .map_err(|_| err(format!("{}: exponent out of range", name)))?;
            AMOUNT_NOT_NATIVE | AMOUNT_POSITIVE | (biased << 54) | mantissa
        }
    };
    out.extend_from_slice(&bits.to_be_bytes());
    out.extend_from_slice(&currency_bytes(&currency)?);
    out.extend_from_slice(&issuer.0);
    Ok(())
}

fn currency_bytes(currency: &CurrencyCode) -> Result<[u8; 20], LedgerError> {
    let code = currency.as_str();
    let mut bytes = [0u8; 20];
    if code.len() == 3 {
        bytes[12..15].copy_from_slice(code.as_bytes());
    } else {
        let decoded = hex::decode(code).map_err(|e| err(format!("currency: {}", e)))?;
        if decoded.len() != bytes.len() {
            return Err(err(format!("currency {} is not 20 bytes", code)));
        }
        bytes.copy_from_slice(&decoded);
    }
    Ok(bytes)
}

fn write_length(len: usize, out: &mut Vec<u8>) -> Result<(), LedgerError> {
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let n = len - 193;
        out.extend_from_slice(&[193 + (n >> 8) as u8, (n & 0xFF) as u8]);
    } else if len <= 918_744 {
        let n = len - 12_481;
        out.extend_from_slice(&[
            241 + (n >> 16) as u8,
            ((n >> 8) & 0xFF) as u8,
            (n & 0xFF) as u8,
        ]);
    } else {
        return Err(err(format!("{} bytes is too long for a blob", len)));
    }
    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LedgerError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| err("unexpected end of blob"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8, LedgerError> {
        Ok(self.take(1)?[0])
    }

    fn header(&mut self) -> Result<(u8, u8), LedgerError> {
        let first = self.byte()?;
        let mut type_code = first >> 4;
        let mut nth = first & 0x0F;
        if type_code == 0 {
            type_code = self.byte()?;
        }
        if nth == 0 {
            nth = self.byte()?;
        }
        Ok((type_code, nth))
    }

    fn length(&mut self) -> Result<usize, LedgerError> {
        let b0 = self.byte()? as usize;
        match b0 {
            0..=192 => Ok(b0),
            193..=240 => {
                let b1 = self.byte()? as usize;
                Ok(193 + (b0 - 193) * 256 + b1)
            }
            241..=254 => {
                let b1 = self.byte()? as usize;
                let b2 = self.byte()? as usize;
                Ok(12_481 + (b0 - 241) * 65_536 + b1 * 256 + b2)
            }
            _ => Err(err("invalid length prefix")),
        }
    }

    fn u64(&mut self) -> Result<u64, LedgerError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    fn account(&mut self) -> Result<ClassicAddress, LedgerError> {
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(self.take(ACCOUNT_ID_LEN)?);
        Ok(AccountId(id).to_address())
    }

    fn read_field(&mut self) -> Result<(&'static str, Value), LedgerError> {
        let (type_code, nth) = self.header()?;
        let field = field_by_code(type_code, nth)?;
        let value = self.read_value(field)?;
        Ok((field.name, value))
    }

    fn read_value(&mut self, field: &Field) -> Result<Value, LedgerError> {
        match field.type_code {
            TYPE_UINT16 => {
                let bytes = self.take(2)?;
                let n = u16::from_be_bytes([bytes[0], bytes[1]]);
                if field.name == "TransactionType" {
                    let name = TRANSACTION_TYPES
                        .iter()
                        .find(|(_, code)| *code == n)
                        .map(|(name, _)| *name)
                        .ok_or_else(|| err(format!("unsupported transaction type {}", n)))?;
                    Ok(Value::from(name))
                } else {
                    Ok(Value::from(n))
                }
            }
            TYPE_UINT32 => {
                let bytes = self.take(4)?;
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::from(u32::from_be_bytes(buf)))
            }
            TYPE_AMOUNT => self.amount(),
            TYPE_BLOB => {
                let len = self.length()?;
                Ok(Value::from(hex::encode_upper(self.take(len)?)))
            }
            TYPE_ACCOUNT => {
                let len = self.length()?;
                if len != ACCOUNT_ID_LEN {
                    return Err(err(format!("{} has length {}", field.name, len)));
                }
                Ok(Value::from(self.account()?.to_string()))
            }
            TYPE_OBJECT => {
                let mut object = Map::new();
                loop {
                    if self.data.get(self.pos) == Some(&OBJECT_END) {
                        self.pos += 1;
                        break;
                    }
                    let (name, value) = self.read_field()?;
                    object.insert(name.to_string(), value);
                }
                Ok(Value::Object(object))
            }
            TYPE_ARRAY => {
                let mut items = Vec::new();
                loop {
                    if self.data.get(self.pos) == Some(&ARRAY_END) {
                        self.pos += 1;
                        break;
                    }
                    let (name, value) = self.read_field()?;
                    let mut wrapper = Map::new();
                    wrapper.insert(name.to_string(), value);
                    items.push(Value::Object(wrapper));
                }
                Ok(Value::Array(items))
            }
            other => Err(err(format!("unsupported type code {}", other))),
        }
    }

    fn amount(&mut self) -> Result<Value, LedgerError> {
        let bits = self.u64()?;
        if bits & AMOUNT_NOT_NATIVE == 0 {
            return Ok(Value::from((bits & !AMOUNT_POSITIVE).to_string()));
        }

        let value = if bits == AMOUNT_NOT_NATIVE {
            "0".to_string()
        } else {
            let exponent = ((bits >> 54) & 0xFF) as i32 - EXPONENT_BIAS;
            format_decimal(bits & MANTISSA_MASK, exponent)
        };

        let raw = self.take(20)?;
        let currency = if raw[..12].iter().all(|b| *b == 0) && raw[15..].iter().all(|b| *b == 0) {
            String::from_utf8_lossy(&raw[12..15]).into_owned()
        } else {
            hex::encode_upper(raw)
        };
        let issuer = self.account()?;

        Ok(serde_json::json!({
            "currency": currency,
            "issuer": issuer.to_string(),
            "value": value,
        }))
    }
}

/// Plain decimal text of `mantissa * 10^exponent`, scientific when long.
fn format_decimal(mut mantissa: u64, mut exponent: i32) -> String {
    while mantissa != 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    let digits = mantissa.to_string();
    if (0..=10).contains(&exponent) {
        format!("{}{}", digits, "0".repeat(exponent as usize))
    } else if exponent < 0 && exponent >= -32 {
        let shift = (-exponent) as usize;
        if digits.len() > shift {
            let (int_part, frac_part) = digits.split_at(digits.len() - shift);
            format!("{}.{}", int_part, frac_part)
        } else {
            format!("0.{}{}", "0".repeat(shift - digits.len()), digits)
        }
    } else {
        format!("{}e{}", digits, exponent)
    }
}
