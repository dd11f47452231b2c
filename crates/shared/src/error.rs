use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by every request the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Refused locally: nothing was selected, no request was sent.
    EmptySelection,
    /// The request never produced an HTTP response.
    Transport,
    /// Non-2xx status.
    Http,
    /// 2xx with `{"ok": false}`.
    Application,
    /// 2xx whose body does not match the expected schema.
    MalformedResponse,
    /// User-provided structured data could not be parsed.
    MalformedInput,
    /// Reading an upload or writing a download on the local disk failed.
    LocalIo,
}
