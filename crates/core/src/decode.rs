//! Decoding of raw contract events into domain events.
//!
//! The decoder is a pure function: no I/O, no state. Topic and value
//! payloads are base64 XDR `ScVal`s as returned by the Soroban RPC
//! `getEvents` query.
//!
//! Decode rules (per event, the batch always continues):
//!
//! - Topic 0 must be a symbol matching a recognized [`EventKind`] tag.
//!   Anything else - including an XDR decode error - means the event is
//!   not of interest and is silently skipped (`Ok(None)`).
//! - Topic 1 must be an address; failure here is a hard per-event error.
//! - Topic 2, when present, carries an integer loan id; an undecodable
//!   value degrades to `None`.
//! - The value payload carries an i128 amount; any other shape yields
//!   `amount = None` rather than failing the event.

use stellar_xdr::curr::{Int128Parts, Limits, ReadXdr, ScAddress, ScVal};

use crate::error::{DecodeError, DecodeResult};
use crate::models::{DomainEvent, EventKind};
use crate::ports::RawEvent;

/// Decode one raw event.
///
/// Returns `Ok(None)` for events that are not of interest (unrecognized
/// kind tag), `Err` for events that look like ours but are malformed.
pub fn decode_event(raw: &RawEvent) -> DecodeResult<Option<DomainEvent>> {
    let Some(kind_topic) = raw.topics.first() else {
        return Ok(None);
    };
    let Some(kind) = decode_kind(kind_topic) else {
        return Ok(None);
    };

    let subject_topic = raw
        .topics
        .get(1)
        .ok_or(DecodeError::MissingTopic { index: 1 })?;
    let subject = decode_address(subject_topic)?;

    let loan_id = raw.topics.get(2).and_then(|topic| decode_loan_id(topic));
    let amount = decode_amount(&raw.value);

    Ok(Some(DomainEvent {
        id: raw.id.clone(),
        kind,
        subject,
        loan_id,
        amount,
        ledger: raw.ledger,
        ledger_closed_at: raw.ledger_closed_at,
        tx_hash: raw.tx_hash.clone(),
        contract_id: raw.contract_id.clone(),
        topics: raw.topics.clone(),
        value_xdr: raw.value.clone(),
    }))
}

/// Decode the kind tag from topic 0. Any failure means "not ours".
fn decode_kind(topic: &str) -> Option<EventKind> {
    match ScVal::from_xdr_base64(topic, Limits::none()) {
        Ok(ScVal::Symbol(sym)) => EventKind::from_tag(&sym.to_utf8_string_lossy()),
        _ => None,
    }
}

/// Decode the subject address from topic 1. Failure is a hard error.
fn decode_address(topic: &str) -> DecodeResult<String> {
    let val = ScVal::from_xdr_base64(topic, Limits::none())
        .map_err(|e| DecodeError::Xdr(e.to_string()))?;

    match val {
        ScVal::Address(address) => Ok(render_address(&address)),
        _ => Err(DecodeError::NotAnAddress),
    }
}

/// Render an XDR address as its strkey form (`G...` / `C...`).
fn render_address(address: &ScAddress) -> String {
    match address {
        ScAddress::Account(account) => {
            let stellar_xdr::curr::PublicKey::PublicKeyTypeEd25519(key) = &account.0;
            stellar_strkey::ed25519::PublicKey(key.0).to_string()
        }
        ScAddress::Contract(hash) => stellar_strkey::Contract(hash.0).to_string(),
    }
}

/// Decode the optional loan id from topic 2. Lenient: undecodable or
/// out-of-range values degrade to `None`.
fn decode_loan_id(topic: &str) -> Option<i64> {
    match ScVal::from_xdr_base64(topic, Limits::none()).ok()? {
        ScVal::U32(v) => Some(i64::from(v)),
        ScVal::I32(v) => Some(i64::from(v)),
        ScVal::U64(v) => i64::try_from(v).ok(),
        ScVal::I64(v) => Some(v),
        _ => None,
    }
}

/// Decode the i128 amount from the value payload, rendered as a decimal
/// string. Lenient: any other shape yields `None`.
fn decode_amount(value: &str) -> Option<String> {
    match ScVal::from_xdr_base64(value, Limits::none()).ok()? {
        ScVal::I128(parts) => Some(i128_from_parts(&parts).to_string()),
        _ => None,
    }
}

fn i128_from_parts(parts: &Int128Parts) -> i128 {
    ((i128::from(parts.hi)) << 64) | i128::from(parts.lo)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stellar_xdr::curr::{AccountId, PublicKey, ScSymbol, Uint256, WriteXdr};

    fn xdr(val: ScVal) -> String {
        val.to_xdr_base64(Limits::none()).unwrap()
    }

    fn sym_topic(tag: &str) -> String {
        xdr(ScVal::Symbol(ScSymbol(tag.try_into().unwrap())))
    }

    fn account_topic(byte: u8) -> String {
        xdr(ScVal::Address(ScAddress::Account(AccountId(
            PublicKey::PublicKeyTypeEd25519(Uint256([byte; 32])),
        ))))
    }

    fn contract_topic(byte: u8) -> String {
        xdr(ScVal::Address(ScAddress::Contract(
            stellar_xdr::curr::Hash([byte; 32]),
        )))
    }

    fn amount_value(amount: i128) -> String {
        xdr(ScVal::I128(Int128Parts {
            hi: (amount >> 64) as i64,
            lo: amount as u64,
        }))
    }

    fn raw_event(topics: Vec<String>, value: String) -> RawEvent {
        RawEvent {
            id: "0004660039930167296-0000000001".into(),
            ledger: 1085,
            ledger_closed_at: Utc::now(),
            contract_id: "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC".into(),
            tx_hash: "a1b2c3".into(),
            topics,
            value,
        }
    }

    #[test]
    fn decodes_loan_requested() {
        let raw = raw_event(
            vec![sym_topic("loan_requested"), account_topic(7)],
            amount_value(1_000_000),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::LoanRequested);
        assert!(event.subject.starts_with('G'));
        assert_eq!(event.subject.len(), 56);
        assert_eq!(event.amount.as_deref(), Some("1000000"));
        assert_eq!(event.loan_id, None);
        assert_eq!(event.id, raw.id);
        assert_eq!(event.topics, raw.topics);
        assert_eq!(event.value_xdr, raw.value);
    }

    #[test]
    fn decodes_contract_subject() {
        let raw = raw_event(
            vec![sym_topic("loan_repaid"), contract_topic(9)],
            amount_value(42),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert!(event.subject.starts_with('C'));
    }

    #[test]
    fn decodes_loan_id_from_third_topic() {
        let raw = raw_event(
            vec![
                sym_topic("loan_approved"),
                account_topic(1),
                xdr(ScVal::U32(7)),
            ],
            amount_value(500),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert_eq!(event.loan_id, Some(7));
    }

    #[test]
    fn negative_amount_survives() {
        let raw = raw_event(
            vec![sym_topic("loan_repaid"), account_topic(2)],
            amount_value(-123_456_789_012_345_678_901_234_567i128),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert_eq!(event.amount.as_deref(), Some("-123456789012345678901234567"));
    }

    #[test]
    fn unrecognized_kind_is_skipped_not_error() {
        let raw = raw_event(
            vec![sym_topic("transfer"), account_topic(3)],
            amount_value(10),
        );
        assert!(decode_event(&raw).unwrap().is_none());
    }

    #[test]
    fn garbage_kind_topic_is_skipped_not_error() {
        let raw = raw_event(
            vec!["not base64 xdr!!".into(), account_topic(3)],
            amount_value(10),
        );
        assert!(decode_event(&raw).unwrap().is_none());
    }

    #[test]
    fn no_topics_is_skipped() {
        let raw = raw_event(vec![], amount_value(10));
        assert!(decode_event(&raw).unwrap().is_none());
    }

    #[test]
    fn missing_subject_topic_is_hard_error() {
        let raw = raw_event(vec![sym_topic("loan_requested")], amount_value(10));
        assert!(matches!(
            decode_event(&raw),
            Err(DecodeError::MissingTopic { index: 1 })
        ));
    }

    #[test]
    fn non_address_subject_is_hard_error() {
        let raw = raw_event(
            vec![sym_topic("loan_requested"), sym_topic("oops")],
            amount_value(10),
        );
        assert!(matches!(decode_event(&raw), Err(DecodeError::NotAnAddress)));
    }

    #[test]
    fn non_numeric_value_degrades_to_no_amount() {
        let raw = raw_event(
            vec![sym_topic("loan_approved"), account_topic(4)],
            xdr(ScVal::Void),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert_eq!(event.amount, None);
    }

    #[test]
    fn undecodable_loan_id_degrades_to_none() {
        let raw = raw_event(
            vec![
                sym_topic("loan_approved"),
                account_topic(5),
                sym_topic("weird"),
            ],
            amount_value(10),
        );

        let event = decode_event(&raw).unwrap().unwrap();
        assert_eq!(event.loan_id, None);
    }
}
