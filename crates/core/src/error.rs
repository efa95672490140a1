/// The roster for this host could not be obtained.
///
/// Any variant aborts the current poll cycle without touching tracker state.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Roster request failed: {0}")]
    Request(String),

    #[error("Roster API returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Roster API rejected the request: {0}")]
    Rejected(String),

    #[error("Roster response could not be decoded: {0}")]
    Decode(String),

    #[error("Invalid roster endpoint: {0}")]
    Endpoint(String),
}

/// An alert could not be handed to the outbound transport.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Alert transport error: {0}")]
    Transport(String),

    #[error("Alert address error: {0}")]
    Address(String),

    #[error("Alert build error: {0}")]
    Build(String),

    #[error("No alert recipients configured")]
    NoRecipients,
}
