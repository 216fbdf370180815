//! System-wide constants for the Snowbroker broker.

/// How long a proxy poll waits for a client offer, in milliseconds.
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 10_000;

/// How long a client waits for the matched proxy's answer, in milliseconds.
pub const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 10_000;

/// Interval between two periodic metrics reports (one day).
pub const DEFAULT_METRICS_INTERVAL_SECS: u64 = 86_400;

/// Default `tracing` filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Maximum accepted size of a request body, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 100_000;

/// Counters exposed for privacy reasons are rounded up to a multiple of this.
pub const METRICS_BIN_SIZE: u64 = 8;

/// Protocol major version understood by the broker for every message kind.
pub const PROTOCOL_MAJOR_VERSION: u32 = 1;

/// Version string written into proxy messages.
pub const PROXY_PROTOCOL_VERSION: &str = "1.0";

/// Version line prefixed to client poll requests.
pub const CLIENT_PROTOCOL_VERSION: &str = "1.0";

/// Fingerprint assumed for clients that do not name a bridge.
pub const DEFAULT_BRIDGE_FINGERPRINT: &str = "2B280B23E1107BB62ABFC40DDCC8824814F80A72";

/// Display name of the built-in bridge list entry.
pub const DEFAULT_BRIDGE_NAME: &str = "default";

/// WebSocket address of the default bridge.
pub const DEFAULT_BRIDGE_WEBSOCKET_ADDRESS: &str = "wss://snowflake.torproject.net/";

/// Client error string: no proxy was available in the selected pool.
pub const STR_NO_PROXIES: &str = "no proxies currently available";

/// Client error string: the matched proxy did not answer in time.
pub const STR_TIMED_OUT: &str = "timed out";

/// Client error string: the client's own request was abandoned.
pub const STR_CANCELLED: &str = "request cancelled";

/// Proxy poll status when a client offer is attached.
pub const STATUS_CLIENT_MATCH: &str = "client match";

/// Proxy poll status when the wait ended without a client.
pub const STATUS_NO_MATCH: &str = "no match";

/// Proxy answer status when the answer reached the waiting client.
pub const STATUS_SUCCESS: &str = "success";

/// Proxy answer status when the client is no longer waiting.
pub const STATUS_CLIENT_GONE: &str = "client gone";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name.
pub const SERVICE_NAME: &str = "Snowbroker";
