//! Proxy ↔ broker messages.
//!
//! ```text
//! poll request     {"Sid":"…","Version":"1.0","Type":"webext","NAT":"restricted","Clients":8}
//! poll response    {"Status":"client match","Offer":"<sdp>","NAT":"unrestricted"}
//!                  {"Status":"no match"}
//! answer request   {"Version":"1.0","Sid":"…","Answer":"<sdp>"}
//! answer response  {"Status":"success"} | {"Status":"client gone"}
//! ```

use serde::{Deserialize, Serialize};
use snowbroker_types::constants::{
    PROXY_PROTOCOL_VERSION, STATUS_CLIENT_GONE, STATUS_CLIENT_MATCH, STATUS_NO_MATCH,
    STATUS_SUCCESS,
};
use snowbroker_types::{
    AnswerOutcome, BrokerError, ClientOffer, NatType, ProxyPollOutcome, ProxyRegistration,
    ProxyType, Result, SessionId,
};

use crate::codec::{check_size, check_version, decode_json, encode_json};

// =====================================================================
// Poll
// =====================================================================

/// Raw proxy poll body. Fields absent on the wire decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyPollRequest {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(rename = "NAT", default)]
    pub nat: String,
    #[serde(default)]
    pub clients: u32,
}

/// Raw proxy poll response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyPollResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub offer: String,
    #[serde(rename = "NAT", default, skip_serializing_if = "String::is_empty")]
    pub nat: String,
}

/// Encode a proxy's poll.
pub fn encode_poll_request(registration: &ProxyRegistration) -> Result<Vec<u8>> {
    encode_json(&ProxyPollRequest {
        sid: registration.id.to_string(),
        version: PROXY_PROTOCOL_VERSION.to_string(),
        r#type: registration.proxy_type.to_string(),
        nat: registration.nat_type.to_string(),
        clients: registration.load,
    })
}

/// Decode and validate a proxy's poll.
///
/// Unrecognised proxy types are accepted as `unknown`; unrecognised NAT
/// classes are rejected.
pub fn decode_poll_request(body: &[u8]) -> Result<ProxyRegistration> {
    check_size(body)?;
    let message: ProxyPollRequest = decode_json(body)?;
    check_version(&message.version)?;
    if message.sid.is_empty() {
        return Err(BrokerError::MissingField("Sid"));
    }
    let nat_type = NatType::from_wire(&message.nat)?;
    Ok(ProxyRegistration::new(
        message.sid,
        ProxyType::from_label(&message.r#type),
        nat_type,
        message.clients,
    ))
}

/// Encode the broker's reply to a proxy poll.
pub fn encode_poll_response(outcome: &ProxyPollOutcome) -> Result<Vec<u8>> {
    let response = match outcome {
        ProxyPollOutcome::Matched(offer) => ProxyPollResponse {
            status: STATUS_CLIENT_MATCH.to_string(),
            offer: offer.sdp.clone(),
            nat: offer.nat_type.to_string(),
        },
        ProxyPollOutcome::NoMatch => ProxyPollResponse {
            status: STATUS_NO_MATCH.to_string(),
            ..ProxyPollResponse::default()
        },
    };
    encode_json(&response)
}

/// Decode the broker's reply to a proxy poll.
///
/// Any status other than `"client match"` means no match.
pub fn decode_poll_response(body: &[u8]) -> Result<ProxyPollOutcome> {
    let message: ProxyPollResponse = decode_json(body)?;
    if message.status.is_empty() {
        return Err(BrokerError::MissingField("Status"));
    }
    if message.status != STATUS_CLIENT_MATCH {
        return Ok(ProxyPollOutcome::NoMatch);
    }
    if message.offer.is_empty() {
        return Err(BrokerError::MissingField("Offer"));
    }
    let nat_type = NatType::from_wire(&message.nat)?;
    Ok(ProxyPollOutcome::Matched(ClientOffer::new(
        message.offer,
        nat_type,
    )))
}

// =====================================================================
// Answer
// =====================================================================

/// Raw proxy answer body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyAnswerRequest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub answer: String,
}

/// A validated answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAnswer {
    pub id: SessionId,
    pub sdp: String,
}

/// Raw proxy answer response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyAnswerResponse {
    #[serde(default)]
    pub status: String,
}

pub fn encode_answer_request(id: &SessionId, sdp: &str) -> Result<Vec<u8>> {
    encode_json(&ProxyAnswerRequest {
        version: PROXY_PROTOCOL_VERSION.to_string(),
        sid: id.to_string(),
        answer: sdp.to_string(),
    })
}

/// Decode and validate a proxy's answer submission.
pub fn decode_answer_request(body: &[u8]) -> Result<ProxyAnswer> {
    check_size(body)?;
    let message: ProxyAnswerRequest = decode_json(body)?;
    check_version(&message.version)?;
    if message.sid.is_empty() {
        return Err(BrokerError::MissingField("Sid"));
    }
    if message.answer.is_empty() {
        return Err(BrokerError::MissingField("Answer"));
    }
    Ok(ProxyAnswer {
        id: SessionId::new(message.sid),
        sdp: message.answer,
    })
}

pub fn encode_answer_response(outcome: AnswerOutcome) -> Result<Vec<u8>> {
    let status = match outcome {
        AnswerOutcome::Delivered => STATUS_SUCCESS,
        AnswerOutcome::ClientGone => STATUS_CLIENT_GONE,
    };
    encode_json(&ProxyAnswerResponse {
        status: status.to_string(),
    })
}

/// Any status other than `"success"` means the client is gone.
pub fn decode_answer_response(body: &[u8]) -> Result<AnswerOutcome> {
    let message: ProxyAnswerResponse = decode_json(body)?;
    match message.status.as_str() {
        "" => Err(BrokerError::MissingField("Status")),
        STATUS_SUCCESS => Ok(AnswerOutcome::Delivered),
        _ => Ok(AnswerOutcome::ClientGone),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn poll_request_full() {
        let reg = decode_poll_request(&body(&json!({
            "Sid": "abc",
            "Version": "1.2",
            "Type": "webext",
            "NAT": "restricted",
            "Clients": 16
        })))
        .unwrap();
        assert_eq!(reg.id.as_str(), "abc");
        assert_eq!(reg.proxy_type, ProxyType::Webext);
        assert_eq!(reg.nat_type, NatType::Restricted);
        assert_eq!(reg.load, 16);
    }

    #[test]
    fn poll_request_minimal_defaults() {
        let reg = decode_poll_request(br#"{"Sid":"abc","Version":"1.0"}"#).unwrap();
        assert_eq!(reg.proxy_type, ProxyType::Unknown);
        assert_eq!(reg.nat_type, NatType::Unknown);
        assert_eq!(reg.load, 0);
    }

    #[test]
    fn poll_request_unknown_type_label_is_unknown() {
        let reg =
            decode_poll_request(br#"{"Sid":"abc","Version":"1.0","Type":"toaster"}"#).unwrap();
        assert_eq!(reg.proxy_type, ProxyType::Unknown);
    }

    #[test]
    fn poll_request_rejections() {
        let cases: [(&[u8], fn(&BrokerError) -> bool); 5] = [
            (br#"{"Sid":"abc","Version":"2.0"}"#, |e| {
                matches!(e, BrokerError::UnsupportedVersion(_))
            }),
            (br#"{"Sid":"abc"}"#, |e| matches!(e, BrokerError::UnsupportedVersion(_))),
            (br#"{"Version":"1.0"}"#, |e| matches!(e, BrokerError::MissingField("Sid"))),
            (br#"{"Sid":"abc","Version":"1.0","NAT":"cone"}"#, |e| {
                matches!(e, BrokerError::InvalidNatType(_))
            }),
            (br#"{"Sid":"abc","Version":"1.0","Clients":-1}"#, |e| {
                matches!(e, BrokerError::Malformed { .. })
            }),
        ];
        for (input, expected) in cases {
            let err = decode_poll_request(input).unwrap_err();
            assert!(expected(&err), "{}: {err}", String::from_utf8_lossy(input));
            assert!(err.is_bad_request());
        }
    }

    #[test]
    fn poll_request_encodes_registration() {
        let reg = ProxyRegistration::new("p1", ProxyType::Badge, NatType::Unrestricted, 3);
        let value: Value = serde_json::from_slice(&encode_poll_request(&reg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"Sid":"p1","Version":"1.0","Type":"badge","NAT":"unrestricted","Clients":3})
        );
    }

    #[test]
    fn poll_response_no_match_shape() {
        let bytes = encode_poll_response(&ProxyPollOutcome::NoMatch).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"Status": "no match"}));
        assert_eq!(decode_poll_response(&bytes).unwrap(), ProxyPollOutcome::NoMatch);
    }

    #[test]
    fn poll_response_match_shape() {
        let outcome = ProxyPollOutcome::Matched(ClientOffer::new("sdp", NatType::Restricted));
        let bytes = encode_poll_response(&outcome).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({"Status": "client match", "Offer": "sdp", "NAT": "restricted"})
        );
        assert_eq!(decode_poll_response(&bytes).unwrap(), outcome);
    }

    #[test]
    fn poll_response_match_without_offer_is_rejected() {
        let err = decode_poll_response(br#"{"Status":"client match"}"#).unwrap_err();
        assert!(matches!(err, BrokerError::MissingField("Offer")));
        let err = decode_poll_response(b"{}").unwrap_err();
        assert!(matches!(err, BrokerError::MissingField("Status")));
    }

    #[test]
    fn answer_request_validation() {
        let answer =
            decode_answer_request(br#"{"Version":"1.0","Sid":"p1","Answer":"sdp"}"#).unwrap();
        assert_eq!(answer.id.as_str(), "p1");
        assert_eq!(answer.sdp, "sdp");

        let err = decode_answer_request(br#"{"Version":"1.0","Answer":"sdp"}"#).unwrap_err();
        assert!(matches!(err, BrokerError::MissingField("Sid")));
        let err = decode_answer_request(br#"{"Version":"1.0","Sid":"p1"}"#).unwrap_err();
        assert!(matches!(err, BrokerError::MissingField("Answer")));
        let err = decode_answer_request(br#"{"Version":"3.0","Sid":"p1","Answer":"a"}"#)
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnsupportedVersion(_)));
    }

    #[test]
    fn answer_request_encodes_version() {
        let bytes = encode_answer_request(&SessionId::new("p1"), "sdp").unwrap();
        let answer = decode_answer_request(&bytes).unwrap();
        assert_eq!(answer.id.as_str(), "p1");
    }

    #[test]
    fn answer_response_statuses() {
        let bytes = encode_answer_response(AnswerOutcome::Delivered).unwrap();
        assert_eq!(bytes, br#"{"Status":"success"}"#);
        let bytes = encode_answer_response(AnswerOutcome::ClientGone).unwrap();
        assert_eq!(bytes, br#"{"Status":"client gone"}"#);

        assert_eq!(
            decode_answer_response(br#"{"Status":"success"}"#).unwrap(),
            AnswerOutcome::Delivered
        );
        assert_eq!(
            decode_answer_response(br#"{"Status":"client gone"}"#).unwrap(),
            AnswerOutcome::ClientGone
        );
        assert!(decode_answer_response(b"{}").is_err());
    }

    #[test]
    fn oversized_body_rejected_before_parsing() {
        let mut big = br#"{"Sid":"abc","Version":"1.0","Type":""#.to_vec();
        big.resize(200_000, b'a');
        let err = decode_poll_request(&big).unwrap_err();
        assert!(matches!(err, BrokerError::MessageTooLarge { .. }));
    }
}
