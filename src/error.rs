use thiserror::Error;

/// Failure taxonomy for the prediction pipeline. Every stage converts its own
/// known failure modes into one of these before they reach the UI; the UI only
/// ever shows `user_message()`, the full chain goes to the log.
#[derive(Debug, Error)]
pub enum PredictError {
    /// Models or season data are absent. Fatal for the current session: the
    /// user is informed and no prediction is attempted.
    #[error("missing resource: {0}")]
    ResourceMissing(String),

    /// Unresolvable player/opponent or failed feature construction.
    /// Recoverable: the user corrects the input and retries.
    #[error("input error: {0}")]
    Input(String),

    /// Visualization failure. The rest of the result is still shown.
    #[error("render error: {0}")]
    Render(String),

    /// Catch-all for everything unanticipated.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl PredictError {
    /// Message safe to put in front of the user. Never contains a backtrace
    /// or an internal error chain.
    pub fn user_message(&self) -> String {
        match self {
            PredictError::ResourceMissing(msg) => msg.clone(),
            PredictError::Input(msg) => msg.clone(),
            PredictError::Render(_) => "Visualization unavailable.".to_string(),
            PredictError::Unexpected(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_message_is_shown_verbatim() {
        let err = PredictError::Input("Player not found. Please check the name.".to_string());
        assert_eq!(err.user_message(), "Player not found. Please check the name.");
    }

    #[test]
    fn unexpected_message_hides_detail() {
        let err = PredictError::Unexpected(anyhow::anyhow!("socket reset by peer at 10.0.0.3"));
        assert!(!err.user_message().contains("10.0.0.3"));
    }
}
