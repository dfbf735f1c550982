//! Trade message decoding
//!
//! The trade schema is flat: 26 numbered fields, each a string, integer or
//! double. Every field is optional with real absence semantics: a missing
//! field never turns into `0` or `""` downstream, which is why each one is an
//! `Option` and the JSON serialization skips `None`.

use super::skip::skip_field;
use super::varint::{read_length_delimited, read_varint, write_varint};
use super::WireType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One decoded trade event.
///
/// Fields are declared in protobuf field-number order; serde emits JSON keys
/// in declaration order, so serialized records are always in the canonical
/// field order regardless of the order fields arrived on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Field 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Field 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,

    /// Field 3, epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Field 4
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Field 5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    /// Field 6
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Field 7
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<i32>,

    /// Field 8
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_num: Option<i32>,

    /// Field 9
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,

    /// Field 10
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_pips: Option<i32>,

    /// Field 11
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_measurement: Option<f64>,

    /// Field 12
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,

    /// Field 13
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    /// Field 14
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nt_balance: Option<f64>,

    /// Field 15
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nt_daily_pnl: Option<f64>,

    /// Field 16
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nt_trade_result: Option<String>,

    /// Field 17
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nt_session_trades: Option<i32>,

    /// Field 18
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mt5_ticket: Option<u64>,

    /// Field 19
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nt_points_per_1k_loss: Option<f64>,

    /// Field 20
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Field 21
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_current_profit: Option<f64>,

    /// Field 22
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_profit_level: Option<i32>,

    /// Field 23
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qt_trade_id: Option<String>,

    /// Field 24
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qt_position_id: Option<String>,

    /// Field 25
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_tag: Option<String>,

    /// Field 26
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_platform: Option<String>,
}

impl TradeRecord {
    /// Decode a trade record from raw protobuf bytes.
    ///
    /// Decoding is total or fails: any read failure aborts the whole decode,
    /// there is no partial record. An empty payload decodes to an all-absent
    /// record. Unknown field numbers are skipped by their actual wire type;
    /// a known field carrying the wrong wire type is a decode failure, not a
    /// coercion.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut rec = Self::default();
        let mut cursor = 0;

        while cursor < buf.len() {
            let key = read_varint(buf, &mut cursor)?;
            let field = (key >> 3) as u32;
            let wt = (key & 0x07) as u32;

            match field {
                1 => rec.id = Some(read_string(field, wt, buf, &mut cursor)?),
                2 => rec.base_id = Some(read_string(field, wt, buf, &mut cursor)?),
                3 => rec.timestamp = Some(read_varint_checked(field, wt, buf, &mut cursor)? as i64),
                4 => rec.action = Some(read_string(field, wt, buf, &mut cursor)?),
                5 => rec.quantity = Some(read_double(field, wt, buf, &mut cursor)?),
                6 => rec.price = Some(read_double(field, wt, buf, &mut cursor)?),
                7 => {
                    rec.total_quantity =
                        Some(read_varint_checked(field, wt, buf, &mut cursor)? as i32);
                }
                8 => {
                    rec.contract_num =
                        Some(read_varint_checked(field, wt, buf, &mut cursor)? as i32);
                }
                9 => rec.order_type = Some(read_string(field, wt, buf, &mut cursor)?),
                10 => {
                    rec.measurement_pips =
                        Some(read_varint_checked(field, wt, buf, &mut cursor)? as i32);
                }
                11 => rec.raw_measurement = Some(read_double(field, wt, buf, &mut cursor)?),
                12 => rec.instrument = Some(read_string(field, wt, buf, &mut cursor)?),
                13 => rec.account_name = Some(read_string(field, wt, buf, &mut cursor)?),
                14 => rec.nt_balance = Some(read_double(field, wt, buf, &mut cursor)?),
                15 => rec.nt_daily_pnl = Some(read_double(field, wt, buf, &mut cursor)?),
                16 => rec.nt_trade_result = Some(read_string(field, wt, buf, &mut cursor)?),
                17 => {
                    rec.nt_session_trades =
                        Some(read_varint_checked(field, wt, buf, &mut cursor)? as i32);
                }
                18 => rec.mt5_ticket = Some(read_varint_checked(field, wt, buf, &mut cursor)?),
                19 => rec.nt_points_per_1k_loss = Some(read_double(field, wt, buf, &mut cursor)?),
                20 => rec.event_type = Some(read_string(field, wt, buf, &mut cursor)?),
                21 => rec.elastic_current_profit = Some(read_double(field, wt, buf, &mut cursor)?),
                22 => {
                    rec.elastic_profit_level =
                        Some(read_varint_checked(field, wt, buf, &mut cursor)? as i32);
                }
                23 => rec.qt_trade_id = Some(read_string(field, wt, buf, &mut cursor)?),
                24 => rec.qt_position_id = Some(read_string(field, wt, buf, &mut cursor)?),
                25 => rec.strategy_tag = Some(read_string(field, wt, buf, &mut cursor)?),
                26 => rec.origin_platform = Some(read_string(field, wt, buf, &mut cursor)?),
                _ => skip_field(wt, buf, &mut cursor)?,
            }
        }

        Ok(rec)
    }

    /// Encode this record as protobuf bytes, present fields in field-number
    /// order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        put_str(&mut out, 1, self.id.as_deref());
        put_str(&mut out, 2, self.base_id.as_deref());
        put_varint(&mut out, 3, self.timestamp.map(|v| v as u64));
        put_str(&mut out, 4, self.action.as_deref());
        put_double(&mut out, 5, self.quantity);
        put_double(&mut out, 6, self.price);
        put_varint(&mut out, 7, self.total_quantity.map(widen_i32));
        put_varint(&mut out, 8, self.contract_num.map(widen_i32));
        put_str(&mut out, 9, self.order_type.as_deref());
        put_varint(&mut out, 10, self.measurement_pips.map(widen_i32));
        put_double(&mut out, 11, self.raw_measurement);
        put_str(&mut out, 12, self.instrument.as_deref());
        put_str(&mut out, 13, self.account_name.as_deref());
        put_double(&mut out, 14, self.nt_balance);
        put_double(&mut out, 15, self.nt_daily_pnl);
        put_str(&mut out, 16, self.nt_trade_result.as_deref());
        put_varint(&mut out, 17, self.nt_session_trades.map(widen_i32));
        put_varint(&mut out, 18, self.mt5_ticket);
        put_double(&mut out, 19, self.nt_points_per_1k_loss);
        put_str(&mut out, 20, self.event_type.as_deref());
        put_double(&mut out, 21, self.elastic_current_profit);
        put_varint(&mut out, 22, self.elastic_profit_level.map(widen_i32));
        put_str(&mut out, 23, self.qt_trade_id.as_deref());
        put_str(&mut out, 24, self.qt_position_id.as_deref());
        put_str(&mut out, 25, self.strategy_tag.as_deref());
        put_str(&mut out, 26, self.origin_platform.as_deref());

        out
    }
}

fn expect_wire_type(field: u32, expected: WireType, actual: u32) -> Result<()> {
    if WireType::from_raw(actual) == Some(expected) {
        Ok(())
    } else {
        Err(Error::WireTypeMismatch {
            field,
            expected,
            actual,
        })
    }
}

fn read_string(field: u32, wt: u32, buf: &[u8], cursor: &mut usize) -> Result<String> {
    expect_wire_type(field, WireType::LengthDelimited, wt)?;
    let bytes = read_length_delimited(buf, cursor)?;
    // Bytes are copied verbatim; invalid UTF-8 is replaced, not rejected
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn read_varint_checked(field: u32, wt: u32, buf: &[u8], cursor: &mut usize) -> Result<u64> {
    expect_wire_type(field, WireType::Varint, wt)?;
    read_varint(buf, cursor)
}

fn read_double(field: u32, wt: u32, buf: &[u8], cursor: &mut usize) -> Result<f64> {
    expect_wire_type(field, WireType::Fixed64, wt)?;

    let end = cursor
        .checked_add(8)
        .ok_or(Error::TruncatedInput(*cursor))?;
    if end > buf.len() {
        return Err(Error::TruncatedInput(*cursor));
    }

    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[*cursor..end]);
    *cursor = end;
    Ok(f64::from_le_bytes(raw))
}

// Negative int32 values are sign-extended to 64 bits on the wire
fn widen_i32(value: i32) -> u64 {
    i64::from(value) as u64
}

fn put_tag(out: &mut Vec<u8>, field: u32, wt: WireType) {
    write_varint(out, u64::from(field) << 3 | wt as u64);
}

fn put_str(out: &mut Vec<u8>, field: u32, value: Option<&str>) {
    if let Some(value) = value {
        put_tag(out, field, WireType::LengthDelimited);
        write_varint(out, value.len() as u64);
        out.extend_from_slice(value.as_bytes());
    }
}

fn put_varint(out: &mut Vec<u8>, field: u32, value: Option<u64>) {
    if let Some(value) = value {
        put_tag(out, field, WireType::Varint);
        write_varint(out, value);
    }
}

fn put_double(out: &mut Vec<u8>, field: u32, value: Option<f64>) {
    if let Some(value) = value {
        put_tag(out, field, WireType::Fixed64);
        out.extend_from_slice(&value.to_le_bytes());
    }
}
