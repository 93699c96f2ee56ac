use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request to {path} failed with status {status}")]
    Status {
        path: String,
        status: u16,
        message: Option<String>,
    },
    #[error("Malformed response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Payment creation failed: {0}")]
    Create(#[from] ApiError),
    #[error("Payment response has no payment_id")]
    MissingPaymentId,
    #[error("Payment attempt was superseded")]
    Superseded,
}

impl PaymentError {
    /// Message shown in the blocking alert after a failed create.
    pub fn user_message(&self) -> &'static str {
        match self {
            PaymentError::InvalidAmount => "Please choose a valid amount.",
            PaymentError::Create(_) | PaymentError::MissingPaymentId => {
                "Could not create the payment. Please try again."
            }
            PaymentError::Superseded => "",
        }
    }
}
