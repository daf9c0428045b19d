use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Could not initialize PayPal client: {0}")]
    Initialization(String),
    #[error("PayPal request failed: {0}")]
    Transport(String),
    #[error("PayPal authentication failed: {0}")]
    Authentication(String),
    #[error("PayPal request failed. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed PayPal response: {0}")]
    MalformedResponse(String),
    #[error("Approval URL not found in PayPal order response.")]
    MissingApprovalLink,
}
