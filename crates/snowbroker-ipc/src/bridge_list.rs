//! Bridges the broker is willing to route clients to.
//!
//! The list is newline-delimited JSON, one bridge per line:
//!
//! ```text
//! {"displayName":"default","webSocketAddress":"wss://snowflake.torproject.net/","fingerprint":"2B280B23E1107BB62ABFC40DDCC8824814F80A72"}
//! ```
//!
//! Any other field makes the line invalid. A load either takes every line or
//! none of them; on failure the previously loaded list stays in place.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use snowbroker_types::constants::{DEFAULT_BRIDGE_NAME, DEFAULT_BRIDGE_WEBSOCKET_ADDRESS};
use snowbroker_types::{BridgeFingerprint, BrokerError, Result};

/// One entry of the bridge list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BridgeInfo {
    /// Human-facing name. Not used for routing.
    pub display_name: String,
    /// Where proxies reach the bridge.
    pub web_socket_address: String,
    /// Hex fingerprint clients name the bridge by.
    pub fingerprint: String,
}

/// Bridge list keyed by fingerprint. Safe to reload while requests read it.
#[derive(Debug, Default)]
pub struct BridgeList {
    bridges: RwLock<HashMap<BridgeFingerprint, BridgeInfo>>,
}

impl BridgeList {
    /// An empty list; every fingerprint is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding only the default bridge.
    #[must_use]
    pub fn with_default_bridge() -> Self {
        let fingerprint = BridgeFingerprint::default_bridge();
        let info = BridgeInfo {
            display_name: DEFAULT_BRIDGE_NAME.to_string(),
            web_socket_address: DEFAULT_BRIDGE_WEBSOCKET_ADDRESS.to_string(),
            fingerprint: fingerprint.to_hex(),
        };
        Self {
            bridges: RwLock::new(HashMap::from([(fingerprint, info)])),
        }
    }

    /// Read a list file and replace the current contents with it.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let loaded = self.load(std::io::BufReader::new(file))?;
        tracing::info!(path = %path.display(), bridges = loaded, "Bridge list loaded");
        Ok(loaded)
    }

    /// Replace the current contents with the records read from `reader`.
    ///
    /// Blank lines are skipped. Returns the number of bridges now listed.
    pub fn load(&self, reader: impl BufRead) -> Result<usize> {
        let mut parsed = HashMap::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |reason: String| {
                BrokerError::Configuration(format!("bridge list line {}: {reason}", n + 1))
            };
            let info: BridgeInfo =
                serde_json::from_str(&line).map_err(|e| invalid(e.to_string()))?;
            let fingerprint: BridgeFingerprint =
                info.fingerprint.parse().map_err(|e: BrokerError| invalid(e.to_string()))?;
            parsed.insert(fingerprint, info);
        }
        let count = parsed.len();
        *self.bridges.write() = parsed;
        Ok(count)
    }

    /// The bridge listed under `fingerprint`, if any.
    #[must_use]
    pub fn get(&self, fingerprint: &BridgeFingerprint) -> Option<BridgeInfo> {
        self.bridges.read().get(fingerprint).cloned()
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &BridgeFingerprint) -> bool {
        self.bridges.read().contains_key(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bridges.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bridges.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const DEFAULT_BRIDGES: &str = r#"{"displayName":"default", "webSocketAddress":"wss://snowflake.torproject.org", "fingerprint":"2B280B23E1107BB62ABFC40DDCC8824814F80A72"}
"#;

    fn imaginary_bridges() -> String {
        let mut list = DEFAULT_BRIDGES.to_string();
        for i in 0..10 {
            list.push_str(&format!(
                "{{\"displayName\":\"imaginary-{n}\", \"webSocketAddress\":\"wss://imaginary-{n}-snowflake.torproject.org\", \"fingerprint\":\"2B280B23E1107BB62ABFC40DDCC8824814F80B{i:02}\"}}\n",
                n = i + 1
            ));
        }
        list
    }

    fn fingerprint(hex: &str) -> BridgeFingerprint {
        hex.parse().unwrap()
    }

    #[test]
    fn load_default_list() {
        let list = BridgeList::new();
        assert_eq!(list.load(DEFAULT_BRIDGES.as_bytes()).unwrap(), 1);

        let info = list.get(&BridgeFingerprint::default_bridge()).unwrap();
        assert_eq!(info.display_name, "default");
        assert_eq!(info.web_socket_address, "wss://snowflake.torproject.org");
    }

    #[test]
    fn load_imaginary_list() {
        let list = BridgeList::new();
        assert_eq!(list.load(imaginary_bridges().as_bytes()).unwrap(), 11);

        let info = list
            .get(&fingerprint("2B280B23E1107BB62ABFC40DDCC8824814F80B07"))
            .unwrap();
        assert_eq!(info.display_name, "imaginary-8");
        assert_eq!(info.web_socket_address, "wss://imaginary-8-snowflake.torproject.org");
        assert!(list.get(&fingerprint("2B280B23E1107BB62ABFC40DDCC8824814F80B10")).is_none());
    }

    #[test]
    fn built_in_list_has_default_bridge() {
        let list = BridgeList::with_default_bridge();
        assert_eq!(list.len(), 1);
        let info = list.get(&BridgeFingerprint::default_bridge()).unwrap();
        assert_eq!(info.web_socket_address, DEFAULT_BRIDGE_WEBSOCKET_ADDRESS);
        assert!(BridgeList::new().is_empty());
    }

    #[test]
    fn unknown_field_rejects_whole_list() {
        let list = BridgeList::with_default_bridge();
        let input = format!(
            "{}{}",
            imaginary_bridges(),
            r#"{"displayName":"x","webSocketAddress":"wss://x","fingerprint":"2B280B23E1107BB62ABFC40DDCC8824814F80C00","weight":3}"#
        );
        let err = list.load(input.as_bytes()).unwrap_err();
        assert!(matches!(err, BrokerError::Configuration(ref m) if m.contains("line 12")), "{err}");

        // Nothing from the rejected input was taken.
        assert_eq!(list.len(), 1);
        assert!(list.get(&fingerprint("2B280B23E1107BB62ABFC40DDCC8824814F80B07")).is_none());
    }

    #[test]
    fn bad_lines_rejected() {
        let cases = [
            r#"{"displayName":"short","webSocketAddress":"wss://x","fingerprint":"2B28"}"#,
            r#"{"displayName":"nothex","webSocketAddress":"wss://x","fingerprint":"ZZ280B23E1107BB62ABFC40DDCC8824814F80A72"}"#,
            r#"{"displayName":"partial","webSocketAddress":"wss://x"}"#,
            "not json",
        ];
        for line in cases {
            let list = BridgeList::new();
            let err = list.load(line.as_bytes()).unwrap_err();
            assert!(matches!(err, BrokerError::Configuration(_)), "{line}: {err}");
            assert!(list.is_empty());
        }
    }

    #[test]
    fn reload_replaces_contents() {
        let list = BridgeList::new();
        list.load(imaginary_bridges().as_bytes()).unwrap();
        list.load(format!("\n{DEFAULT_BRIDGES}\n").as_bytes()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.contains(&BridgeFingerprint::default_bridge()));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridges.jsonl");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(imaginary_bridges().as_bytes())
            .unwrap();

        let list = BridgeList::new();
        assert_eq!(list.load_file(&path).unwrap(), 11);

        let err = list.load_file(dir.path().join("missing.jsonl")).unwrap_err();
        assert!(matches!(err, BrokerError::Io(_)));
        assert_eq!(list.len(), 11);
    }
}
