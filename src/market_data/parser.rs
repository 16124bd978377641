use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::market_data::types::RawLevelUpdate;

/// Lifecycle event from the feed (JSON object frames: `info`, `subscribed`,
/// `conf`, `error`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventMsg {
    pub event: String,
    #[serde(rename = "chanId")]
    pub chan_id: Option<u64>,
    pub channel: Option<String>,
    pub symbol: Option<String>,
    pub prec: Option<String>,
    pub freq: Option<String>,
    pub code: Option<i64>,
    pub msg: Option<String>,
}

/// A classified inbound frame.
///
/// Data frames are arrays `[chanId, payload, seq?]` where the payload is
/// `"hb"`, a single `[price, count, amount]` entry, or a snapshot of many
/// such entries. The trailing sequence number is present once the `SEQ_ALL`
/// configuration flag has been acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFrame {
    Event(EventMsg),
    Levels {
        entries: Vec<RawLevelUpdate>,
        seq: Option<u64>,
    },
    Heartbeat {
        seq: Option<u64>,
    },
    /// Well-formed JSON that matches no known frame shape.
    Unknown,
}

pub fn parse_frame(text: &str) -> Result<ParsedFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(_) => match serde_json::from_value::<EventMsg>(value) {
            Ok(event) => Ok(ParsedFrame::Event(event)),
            Err(_) => Ok(ParsedFrame::Unknown),
        },
        Value::Array(items) => Ok(classify_data_frame(&items)),
        _ => Ok(ParsedFrame::Unknown),
    }
}

fn classify_data_frame(items: &[Value]) -> ParsedFrame {
    if items.len() < 2 {
        return ParsedFrame::Unknown;
    }
    let seq = items.get(2).and_then(Value::as_u64);

    match &items[1] {
        Value::String(s) if s == "hb" => ParsedFrame::Heartbeat { seq },
        Value::Array(payload) => {
            // Snapshot payloads nest entries one level deeper than a single
            // update; entries that do not decode are discarded so one bad
            // entry cannot take the frame down with it.
            let entries = if payload.first().is_some_and(Value::is_array) {
                payload.iter().filter_map(parse_entry).collect()
            } else {
                parse_entry(&items[1]).into_iter().collect()
            };
            ParsedFrame::Levels { entries, seq }
        }
        _ => ParsedFrame::Unknown,
    }
}

fn parse_entry(value: &Value) -> Option<RawLevelUpdate> {
    let fields = value.as_array()?;
    if fields.len() < 3 {
        return None;
    }
    Some(RawLevelUpdate {
        price: decimal_field(&fields[0])?,
        count: fields[1].as_i64()?,
        amount: decimal_field(&fields[2])?,
    })
}

/// Decodes a JSON number from its source text (kept verbatim by
/// serde_json's `arbitrary_precision`), so prices never round-trip
/// through `f64`.
fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subscribed_event_is_classified() {
        let frame = parse_frame(
            r#"{"event":"subscribed","channel":"book","chanId":266343,"symbol":"tBTCUSD","prec":"P0","freq":"F1","len":"25"}"#,
        )
        .unwrap();

        match frame {
            ParsedFrame::Event(event) => {
                assert_eq!(event.event, "subscribed");
                assert_eq!(event.chan_id, Some(266343));
                assert_eq!(event.prec.as_deref(), Some("P0"));
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn error_event_carries_its_code() {
        let frame =
            parse_frame(r#"{"event":"error","msg":"symbol: invalid","code":10300}"#).unwrap();
        match frame {
            ParsedFrame::Event(event) => {
                assert_eq!(event.event, "error");
                assert_eq!(event.code, Some(10300));
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn heartbeat_with_and_without_sequence() {
        assert_eq!(
            parse_frame(r#"[266343,"hb",113]"#).unwrap(),
            ParsedFrame::Heartbeat { seq: Some(113) }
        );
        assert_eq!(
            parse_frame(r#"[266343,"hb"]"#).unwrap(),
            ParsedFrame::Heartbeat { seq: None }
        );
    }

    #[test]
    fn single_update_frame_decodes_one_entry() {
        let frame = parse_frame(r#"[266343,[41698,1,0.15],7]"#).unwrap();
        assert_eq!(
            frame,
            ParsedFrame::Levels {
                entries: vec![RawLevelUpdate {
                    price: dec!(41698),
                    count: 1,
                    amount: dec!(0.15),
                }],
                seq: Some(7),
            }
        );
    }

    #[test]
    fn snapshot_frame_decodes_all_entries_in_order() {
        let frame = parse_frame(r#"[266343,[[41698,2,0.3],[41699,1,-0.5]],1]"#).unwrap();
        match frame {
            ParsedFrame::Levels { entries, seq } => {
                assert_eq!(seq, Some(1));
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].price, dec!(41698));
                assert_eq!(entries[1].amount, dec!(-0.5));
            }
            other => panic!("expected levels, got {other:?}"),
        }
    }

    #[test]
    fn prices_decode_without_float_drift() {
        let frame = parse_frame(r#"[266343,[4325.76452913,1,0.1]]"#).unwrap();
        match frame {
            ParsedFrame::Levels { entries, .. } => {
                assert_eq!(entries[0].price.to_string(), "4325.76452913");
                assert_eq!(entries[0].amount, dec!(0.1));
            }
            other => panic!("expected levels, got {other:?}"),
        }
    }

    #[test]
    fn scientific_notation_amounts_still_decode() {
        let frame = parse_frame(r#"[266343,[41698,1,1e-8]]"#).unwrap();
        match frame {
            ParsedFrame::Levels { entries, .. } => {
                assert_eq!(entries[0].amount, dec!(0.00000001));
            }
            other => panic!("expected levels, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_entries_are_discarded_not_fatal() {
        // second entry has a string price, third is short an element
        let frame =
            parse_frame(r#"[266343,[[41698,1,0.3],["oops",1,0.5],[41700,2]],9]"#).unwrap();
        match frame {
            ParsedFrame::Levels { entries, seq } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].price, dec!(41698));
                assert_eq!(seq, Some(9));
            }
            other => panic!("expected levels, got {other:?}"),
        }
    }

    #[test]
    fn unknown_shapes_and_bad_json_are_distinguished() {
        assert_eq!(parse_frame("[1]").unwrap(), ParsedFrame::Unknown);
        assert_eq!(parse_frame(r#"[1,42]"#).unwrap(), ParsedFrame::Unknown);
        assert_eq!(parse_frame("3.14").unwrap(), ParsedFrame::Unknown);
        assert!(parse_frame("not json").is_err());
    }

    #[test]
    fn empty_snapshot_decodes_to_no_entries() {
        let frame = parse_frame(r#"[266343,[],1]"#).unwrap();
        assert_eq!(
            frame,
            ParsedFrame::Levels {
                entries: vec![],
                seq: Some(1),
            }
        );
    }
}
