//! Response helpers shared by the resource clients.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;
use crate::key::Key;

/// Map non-success status codes to the appropriate `ApiError` variant.
/// 401 never reaches here: the executor turns it into an auth error.
pub(crate) fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

pub(crate) fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Rejects an empty key where an operation needs a concrete item.
pub(crate) fn require_key<'a>(key: &'a Key, what: &str) -> Result<&'a Key> {
    if key.is_empty() {
        return Err(ApiError::Validation(format!("{what} must not be empty")));
    }
    Ok(key)
}

/// Decodes an optional wire cursor, treating `null` and `""` alike.
pub(crate) fn decode_cursor(field: Option<String>) -> Result<Option<Key>> {
    match field {
        Some(raw) if !raw.is_empty() => Key::from_wire(&raw).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_maps_codes() {
        assert!(check_status(&HttpResponse::new(200, "")).is_ok());
        assert!(check_status(&HttpResponse::new(201, "")).is_ok());
        assert!(matches!(
            check_status(&HttpResponse::new(404, "")),
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            check_status(&HttpResponse::new(409, "conflict")),
            Err(ApiError::HttpError { status: 409, .. })
        ));
    }

    #[test]
    fn parse_json_bad_body() {
        let err = parse_json::<serde_json::Value>(&HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn decode_cursor_handles_null_and_empty() {
        assert_eq!(decode_cursor(None).unwrap(), None);
        assert_eq!(decode_cursor(Some(String::new())).unwrap(), None);
        assert_eq!(
            decode_cursor(Some("Zm9v".to_string())).unwrap(),
            Some(Key::from("foo"))
        );
    }
}
