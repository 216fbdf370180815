//! Domain outcomes of the three broker operations.
//!
//! None of these are errors. "No match", "no proxies" and "client gone" are
//! the normal, frequent results of a best-effort polling system and are
//! encoded into successful responses.

use serde::{Deserialize, Serialize};

use crate::ClientOffer;

/// Result of a proxy's poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyPollOutcome {
    /// No client claimed the proxy before its wait ended.
    NoMatch,
    /// A client claimed the proxy; its offer must be answered.
    Matched(ClientOffer),
}

impl ProxyPollOutcome {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    #[must_use]
    pub fn offer(&self) -> Option<&ClientOffer> {
        match self {
            Self::Matched(offer) => Some(offer),
            Self::NoMatch => None,
        }
    }
}

/// Result of a client's offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientOutcome {
    /// The matched proxy answered; carries the SDP answer.
    Answered(String),
    /// The selected pool was empty.
    NoProxies,
    /// A proxy was matched but did not answer in time.
    TimedOut,
    /// The client's request was abandoned while waiting.
    Cancelled,
}

impl ClientOutcome {
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answered(answer) => Some(answer),
            _ => None,
        }
    }
}

/// Result of a proxy delivering its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOutcome {
    /// The answer was handed to the waiting client.
    Delivered,
    /// Nobody is waiting for this session any more.
    ClientGone,
}

impl AnswerOutcome {
    #[must_use]
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Status label attached to a finished client poll, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientPollStatus {
    Matched,
    Denied,
    Timeout,
    Cancelled,
}

impl ClientPollStatus {
    pub const ALL: [Self; 4] = [Self::Matched, Self::Denied, Self::Timeout, Self::Cancelled];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Denied => "denied",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<&ClientOutcome> for ClientPollStatus {
    fn from(outcome: &ClientOutcome) -> Self {
        match outcome {
            ClientOutcome::Answered(_) => Self::Matched,
            ClientOutcome::NoProxies => Self::Denied,
            ClientOutcome::TimedOut => Self::Timeout,
            ClientOutcome::Cancelled => Self::Cancelled,
        }
    }
}
