//! JSON body helpers.

use bytes::Bytes;

use crate::Result;

/// MIME type set on requests built with [`RequestBuilder::json`](crate::RequestBuilder::json).
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use tether_core::to_json;
///
/// let bytes = to_json(&serde_json::json!({"refresh_token": "abc"})).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"refresh_token":"abc"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes, reporting the path of the failing field.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`](crate::Error::JsonDeserialization)
/// with a path such as `session.expires_in`.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::Error;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Session {
        access_token: String,
        expires_in: u32,
    }

    #[test]
    fn to_json_keeps_field_order() {
        let session = Session {
            access_token: "t0k3n".to_string(),
            expires_in: 3600,
        };

        let bytes = to_json(&session).expect("serialize");
        check!(bytes.as_ref() == br#"{"access_token":"t0k3n","expires_in":3600}"#);
    }

    #[test]
    fn from_json_reads_struct() {
        let session: Session =
            from_json(br#"{"access_token":"t0k3n","expires_in":60}"#).expect("deserialize");
        check!(session.expires_in == 60);
    }

    #[test]
    fn from_json_reports_field_path() {
        let result = from_json::<Session>(br#"{"access_token":"t0k3n","expires_in":"soon"}"#);

        let_assert!(Err(Error::JsonDeserialization { path, .. }) = result);
        check!(path == "expires_in");
    }

    #[test]
    fn from_json_rejects_plain_text() {
        let result = from_json::<serde_json::Value>(b"OK");
        check!(result.is_err());
    }
}
