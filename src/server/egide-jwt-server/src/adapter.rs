//! Shapes an HTTP request into an [`AuthRequest`].

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use egide_jwt::AuthRequest;
use serde_json::{Map, Value};

/// Builds the authentication record from request parts and the buffered body.
///
/// JSON objects and url-encoded forms become the parsed body; any other
/// content type, or a body that fails to parse, leaves it empty.
pub fn auth_request(parts: &Parts, body: &Bytes) -> AuthRequest {
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let request =
        AuthRequest::new(parts.method.clone(), url).with_headers(parts.headers.clone());

    match parse_body(parts, body) {
        Some(body) => request.with_body(body),
        None => request,
    }
}

fn parse_body(parts: &Parts, body: &Bytes) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }
    let content_type = parts.headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => match serde_json::from_slice(body).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        },
        "application/x-www-form-urlencoded" => {
            let mut map = Map::new();
            for (key, value) in url::form_urlencoded::parse(body) {
                map.entry(key.into_owned())
                    .or_insert_with(|| Value::String(value.into_owned()));
            }
            Some(map)
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_url_and_headers_are_carried() {
        let parts = parts(
            Request::post("/v1/whoami?access_token=abc")
                .header("Authorization", "Bearer xyz"),
        );
        let request = auth_request(&parts, &Bytes::new());

        assert_eq!(request.url(), "/v1/whoami?access_token=abc");
        assert_eq!(request.query(), Some("access_token=abc"));
        assert_eq!(request.method(), "POST");
        assert!(request.headers().contains_key("authorization"));
        assert!(request.body().is_none());
    }

    #[test]
    fn test_json_body() {
        let parts =
            parts(Request::post("/").header("Content-Type", "application/json; charset=utf-8"));
        let request = auth_request(&parts, &Bytes::from_static(br#"{"access_token":"abc","n":1}"#));
        let body = request.body().unwrap();
        assert_eq!(body.get("access_token"), Some(&Value::from("abc")));

        let array = auth_request(&parts, &Bytes::from_static(b"[1,2]"));
        assert!(array.body().is_none());

        let broken = auth_request(&parts, &Bytes::from_static(b"{not json"));
        assert!(broken.body().is_none());
    }

    #[test]
    fn test_form_body_first_value_wins() {
        let parts =
            parts(Request::post("/").header("Content-Type", "application/x-www-form-urlencoded"));
        let request = auth_request(
            &parts,
            &Bytes::from_static(b"access_token=first&access_token=second&note=a+b%21"),
        );
        let body = request.body().unwrap();
        assert_eq!(body.get("access_token"), Some(&Value::from("first")));
        assert_eq!(body.get("note"), Some(&Value::from("a b!")));
    }

    #[test]
    fn test_other_content_types_are_ignored() {
        let parts = parts(Request::post("/").header("Content-Type", "text/plain"));
        let request = auth_request(&parts, &Bytes::from_static(b"access_token=abc"));
        assert!(request.body().is_none());
    }
}
