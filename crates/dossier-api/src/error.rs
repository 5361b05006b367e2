use core::fmt;

use dossier_template::ValidationError;
use ecow::EcoString;
use serde_json::Value;

/// Errors of an API call.
#[derive(Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    Remote {
        /// The HTTP status code.
        status: u16,
        /// The server's `message`, or a generic description of the failed
        /// operation.
        message: EcoString,
    },
    /// The request could not be sent or its response not be read.
    Transport(reqwest::Error),
    /// The response body is not what the operation returns.
    Decode(serde_json::Error),
    /// The request was rejected before it was sent.
    Validation(EcoString),
}

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Builds a [`ApiError::Remote`] from an error response body.
    ///
    /// The server reports failures as `{ "message": ... }` where the message
    /// is either a string or a list of strings. Anything else is described by
    /// `fallback`.
    pub fn remote(status: u16, body: &str, fallback: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|body| server_message(body.get("message")?))
            .unwrap_or_else(|| fallback.into());
        ApiError::Remote { status, message }
    }

    /// The message to show to the user.
    pub fn message(&self) -> EcoString {
        match self {
            ApiError::Remote { message, .. } | ApiError::Validation(message) => message.clone(),
            other => other.to_string().into(),
        }
    }
}

fn server_message(message: &Value) -> Option<EcoString> {
    let message: EcoString = match message {
        Value::String(message) => message.as_str().into(),
        Value::Array(items) => {
            let items: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            items.join("; ").into()
        }
        _ => return None,
    };
    (!message.trim().is_empty()).then_some(message)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Remote { status, message } => write!(f, "{message} (HTTP {status})"),
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Decode(err) => write!(f, "unexpected response: {err}"),
            ApiError::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> EcoString {
        ApiError::remote(400, body, "Error al crear plantilla").message()
    }

    #[test]
    fn server_messages() {
        assert_eq!(message(r#"{"message":"Nombre duplicado"}"#), "Nombre duplicado");
        assert_eq!(
            message(r#"{"message":["nombre must be a string","fuente should not be empty"]}"#),
            "nombre must be a string; fuente should not be empty"
        );
    }

    #[test]
    fn fallback_messages() {
        assert_eq!(message(""), "Error al crear plantilla");
        assert_eq!(message("<html>Bad Gateway</html>"), "Error al crear plantilla");
        assert_eq!(message(r#"{"error":"Bad Request"}"#), "Error al crear plantilla");
        assert_eq!(message(r#"{"message":"  "}"#), "Error al crear plantilla");
        assert_eq!(message(r#"{"message":42}"#), "Error al crear plantilla");
    }

    #[test]
    fn display_includes_status() {
        let err = ApiError::remote(404, r#"{"message":"Plantilla no encontrada"}"#, "x");
        assert_eq!(err.to_string(), "Plantilla no encontrada (HTTP 404)");
    }
}
