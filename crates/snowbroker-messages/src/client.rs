//! Client ↔ broker messages.
//!
//! A client poll is a version line followed by a JSON body:
//!
//! ```text
//! 1.0
//! {"offer":"<sdp>","nat":"unknown","fingerprint":"2B280B23E1107BB62ABFC40DDCC8824814F80A72"}
//! ```
//!
//! `nat` and `fingerprint` are optional. The response is `{"answer":"<sdp>"}`
//! on success, otherwise `{"error":"<reason>"}`.

use serde::{Deserialize, Serialize};
use snowbroker_types::constants::{
    CLIENT_PROTOCOL_VERSION, STR_CANCELLED, STR_NO_PROXIES, STR_TIMED_OUT,
};
use snowbroker_types::{BridgeFingerprint, BrokerError, ClientOffer, ClientOutcome, NatType, Result};

use crate::codec::{check_size, check_version, decode_json, encode_json};

/// Raw client poll body (the part after the version line).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPollRequest {
    #[serde(default)]
    pub offer: String,
    #[serde(default)]
    pub nat: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// A validated client poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPoll {
    pub offer: ClientOffer,
    /// Bridge the client wants to reach. Carried for the proxy side; the
    /// matching engine does not look at it.
    pub fingerprint: BridgeFingerprint,
}

/// Raw client poll response body. Exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPollResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Encode a client poll, version line included.
pub fn encode_client_poll_request(
    offer: &ClientOffer,
    fingerprint: &BridgeFingerprint,
) -> Result<Vec<u8>> {
    let body = encode_json(&ClientPollRequest {
        offer: offer.sdp.clone(),
        nat: offer.nat_type.to_string(),
        fingerprint: fingerprint.to_hex(),
    })?;
    let mut out = Vec::with_capacity(CLIENT_PROTOCOL_VERSION.len() + 1 + body.len());
    out.extend_from_slice(CLIENT_PROTOCOL_VERSION.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode and validate a client poll.
pub fn decode_client_poll_request(body: &[u8]) -> Result<ClientPoll> {
    check_size(body)?;
    let Some(split) = body.iter().position(|&b| b == b'\n') else {
        return Err(BrokerError::Malformed {
            reason: "missing version line".to_string(),
        });
    };
    let (version, json) = (&body[..split], &body[split + 1..]);
    check_version(&String::from_utf8_lossy(version))?;

    let message: ClientPollRequest = decode_json(json)?;
    if message.offer.is_empty() {
        return Err(BrokerError::MissingField("offer"));
    }
    let nat_type = NatType::from_wire(&message.nat)?;
    let fingerprint = if message.fingerprint.is_empty() {
        BridgeFingerprint::default_bridge()
    } else {
        message.fingerprint.parse()?
    };
    Ok(ClientPoll {
        offer: ClientOffer::new(message.offer, nat_type),
        fingerprint,
    })
}

/// Encode the broker's reply to a client poll.
pub fn encode_client_poll_response(outcome: &ClientOutcome) -> Result<Vec<u8>> {
    let response = match outcome {
        ClientOutcome::Answered(answer) => ClientPollResponse {
            answer: answer.clone(),
            ..ClientPollResponse::default()
        },
        ClientOutcome::NoProxies => error_response(STR_NO_PROXIES),
        ClientOutcome::TimedOut => error_response(STR_TIMED_OUT),
        ClientOutcome::Cancelled => error_response(STR_CANCELLED),
    };
    encode_json(&response)
}

fn error_response(reason: &str) -> ClientPollResponse {
    ClientPollResponse {
        error: reason.to_string(),
        ..ClientPollResponse::default()
    }
}

/// Decode the broker's reply to a client poll.
pub fn decode_client_poll_response(body: &[u8]) -> Result<ClientOutcome> {
    let message: ClientPollResponse = decode_json(body)?;
    match (message.answer.is_empty(), message.error.as_str()) {
        (false, "") => Ok(ClientOutcome::Answered(message.answer)),
        (true, "") => Err(BrokerError::MissingField("answer")),
        (_, STR_NO_PROXIES) => Ok(ClientOutcome::NoProxies),
        (_, STR_TIMED_OUT) => Ok(ClientOutcome::TimedOut),
        (_, STR_CANCELLED) => Ok(ClientOutcome::Cancelled),
        (_, other) => Err(BrokerError::Malformed {
            reason: format!("unrecognised broker error {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn poll(body: &str) -> Result<ClientPoll> {
        decode_client_poll_request(body.as_bytes())
    }

    #[test]
    fn minimal_poll_gets_defaults() {
        let decoded = poll("1.0\n{\"offer\":\"sdp\"}").unwrap();
        assert_eq!(decoded.offer.sdp, "sdp");
        assert_eq!(decoded.offer.nat_type, NatType::Unknown);
        assert_eq!(decoded.fingerprint, BridgeFingerprint::default_bridge());
    }

    #[test]
    fn explicit_nat_and_fingerprint() {
        let decoded = poll(
            "1.3\n{\"offer\":\"sdp\",\"nat\":\"unrestricted\",\
             \"fingerprint\":\"8838024498816A039FCBBAB14E6F40A0843051FA\"}",
        )
        .unwrap();
        assert_eq!(decoded.offer.nat_type, NatType::Unrestricted);
        assert_eq!(
            decoded.fingerprint.to_hex(),
            "8838024498816A039FCBBAB14E6F40A0843051FA"
        );
    }

    #[test]
    fn lowercase_fingerprint_accepted() {
        let decoded = poll(
            "1.0\n{\"offer\":\"sdp\",\"fingerprint\":\"2b280b23e1107bb62abfc40ddcc8824814f80a72\"}",
        )
        .unwrap();
        assert_eq!(decoded.fingerprint, BridgeFingerprint::default_bridge());
    }

    #[test]
    fn rejections() {
        let cases: [(&str, fn(&BrokerError) -> bool); 7] = [
            ("{\"offer\":\"sdp\"}", |e| matches!(e, BrokerError::Malformed { .. })),
            ("2.0\n{\"offer\":\"sdp\"}", |e| {
                matches!(e, BrokerError::UnsupportedVersion(_))
            }),
            ("1.0\n{}", |e| matches!(e, BrokerError::MissingField("offer"))),
            ("1.0\n{\"offer\":\"sdp\",\"nat\":\"symmetric\"}", |e| {
                matches!(e, BrokerError::InvalidNatType(_))
            }),
            ("1.0\n{\"offer\":\"sdp\",\"fingerprint\":\"ABCD\"}", |e| {
                matches!(e, BrokerError::InvalidFingerprint { .. })
            }),
            (
                "1.0\n{\"offer\":\"sdp\",\"fingerprint\":\"ZZ280B23E1107BB62ABFC40DDCC8824814F80A72\"}",
                |e| matches!(e, BrokerError::InvalidFingerprint { .. }),
            ),
            ("1.0\nnot json", |e| matches!(e, BrokerError::Malformed { .. })),
        ];
        for (input, expected) in cases {
            let err = poll(input).unwrap_err();
            assert!(expected(&err), "{input:?}: {err}");
            assert!(err.is_bad_request());
        }
    }

    #[test]
    fn encoded_poll_decodes() {
        let offer = ClientOffer::new("sdp", NatType::Restricted);
        let bytes =
            encode_client_poll_request(&offer, &BridgeFingerprint::default_bridge()).unwrap();
        assert!(bytes.starts_with(b"1.0\n"));
        let decoded = decode_client_poll_request(&bytes).unwrap();
        assert_eq!(decoded.offer, offer);
    }

    #[test]
    fn response_shapes() {
        let cases = [
            (ClientOutcome::Answered("sdp".into()), json!({"answer": "sdp"})),
            (
                ClientOutcome::NoProxies,
                json!({"error": "no proxies currently available"}),
            ),
            (ClientOutcome::TimedOut, json!({"error": "timed out"})),
            (ClientOutcome::Cancelled, json!({"error": "request cancelled"})),
        ];
        for (outcome, expected) in cases {
            let bytes = encode_client_poll_response(&outcome).unwrap();
            let value: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(value, expected);
            assert_eq!(decode_client_poll_response(&bytes).unwrap(), outcome);
        }
    }

    #[test]
    fn empty_response_rejected() {
        assert!(decode_client_poll_response(b"{}").is_err());
        assert!(decode_client_poll_response(br#"{"error":"gremlins"}"#).is_err());
    }
}
