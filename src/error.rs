/// Why the buy endpoint refused a purchase, in the order the response
/// flags are checked. The first tripped flag wins; the nested result
/// code is only consulted when no flag fired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("session expired before the purchase was accepted")]
    AuthExpired,

    #[error("purchase blocked: access was flagged as abnormal")]
    Blocked,

    #[error("game is administratively closed: {0}")]
    GameManaged(String),

    #[error("outside the ticket sale time window")]
    OutsideSaleWindow,

    #[error("purchase rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LottoError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("the lottery site is under system maintenance")]
    Maintenance,

    #[error("RSA key setup failed: {0}")]
    CipherInit(String),

    #[error("login failed: {0}")]
    Auth(String),

    #[error("game count {0} is out of range (1..=5)")]
    GameCount(u8),

    #[error("round range {start}..={end} is reversed or spans more than 20 rounds")]
    InvalidRange { start: i64, end: i64 },

    #[error(transparent)]
    Buy(#[from] RejectReason),

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LottoError>;
