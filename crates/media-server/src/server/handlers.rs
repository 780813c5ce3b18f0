//! Axum request handlers for the media endpoints.
//!
//! Every failure (missing parameter, lookup miss, empty payload, generation
//! error) is logged and answered with an empty `200 OK`. No error status or
//! error body is ever sent back: the caller already has local access, and the
//! response should not describe internal state.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::{
    extract::{Query, State},
    http::{
        header::{self, InvalidHeaderValue},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use common::protocol::{
    AUDIO_CONTENT_TYPE, FALLBACK_CONTENT_TYPE, IDENTICON_CONTENT_TYPE, IDENTICON_EXPIRY_YEARS,
    IMMUTABLE_CACHE, MESSAGE_ID_PARAM, NO_STORE, PUBLIC_KEY_PARAM,
};
use tracing::{error, warn};

use super::state::AppState;
use crate::store::StoreError;

/// Raw query pairs in arrival order. Malformed query strings extract as `None`.
type QueryPairs = Option<Query<Vec<(String, String)>>>;

const SECS_PER_YEAR: u64 = 31_557_600;

/// `GET /messages/images?messageId=`: image attached to a message.
///
/// The content type is sniffed from the payload; unrecognised payloads are
/// sent as `application/octet-stream`.
pub async fn image(State(state): State<AppState>, query: QueryPairs) -> Response {
    let Some(message_id) = required_param(query, MESSAGE_ID_PARAM) else {
        error!("no messageId");
        return end_without_body();
    };

    let messages = Arc::clone(&state.messages);
    let Some(image) = load_payload("image", move || messages.image_payload(&message_id)).await
    else {
        return end_without_body();
    };

    let mime = match state.sniffer.detect(&image) {
        Ok(mime) => mime,
        Err(e) => {
            error!(error = %e, "failed to get mime");
            FALLBACK_CONTENT_TYPE
        }
    };

    uncacheable(mime, image)
}

/// `GET /messages/audio?messageId=`: audio attached to a message, always AAC.
pub async fn audio(State(state): State<AppState>, query: QueryPairs) -> Response {
    let Some(message_id) = required_param(query, MESSAGE_ID_PARAM) else {
        error!("no messageId");
        return end_without_body();
    };

    let messages = Arc::clone(&state.messages);
    let Some(audio) = load_payload("audio", move || messages.audio_payload(&message_id)).await
    else {
        return end_without_body();
    };

    uncacheable(AUDIO_CONTENT_TYPE, audio)
}

/// `GET /messages/identicons?publicKey=`: avatar derived from a public key.
///
/// Output never changes for a key, so the response is cacheable forever. If
/// generation fails after producing some bytes, those bytes are still sent.
pub async fn identicon(State(state): State<AppState>, query: QueryPairs) -> Response {
    let Some(public_key) = required_param(query, PUBLIC_KEY_PARAM) else {
        error!("no publicKey");
        return end_without_body();
    };

    let generator = Arc::clone(&state.identicons);
    let image = match tokio::task::spawn_blocking(move || generator.generate(&public_key)).await {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => {
            error!(error = %e, "could not generate identicon");
            match e.partial_output() {
                Some(partial) => partial.to_vec(),
                None => return end_without_body(),
            }
        }
        Err(e) => {
            error!(error = %e, "identicon task failed");
            return end_without_body();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(IDENTICON_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));
    match far_future_expiry() {
        Ok(expires) => {
            headers.insert(header::EXPIRES, expires);
        }
        Err(e) => warn!(error = %e, "failed to format Expires header"),
    }

    (headers, image).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First value of `name`; absent or empty values count as missing.
fn required_param(query: QueryPairs, name: &str) -> Option<String> {
    let Query(pairs) = query?;
    pairs
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Run a blocking store lookup and keep only non-empty payloads.
async fn load_payload<F>(kind: &'static str, lookup: F) -> Option<Vec<u8>>
where
    F: FnOnce() -> Result<Option<Vec<u8>>, StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(lookup).await {
        Ok(Ok(Some(payload))) if !payload.is_empty() => Some(payload),
        Ok(Ok(Some(_))) => {
            error!(kind, "empty payload");
            None
        }
        Ok(Ok(None)) => {
            error!(kind, "payload not found");
            None
        }
        Ok(Err(e)) => {
            error!(kind, error = %e, "failed to look up payload");
            None
        }
        Err(e) => {
            error!(kind, error = %e, "payload lookup task failed");
            None
        }
    }
}

/// Body with `content_type` that clients must not cache.
fn uncacheable(content_type: &str, body: Vec<u8>) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE)),
        ],
        body,
    )
        .into_response()
}

fn end_without_body() -> Response {
    StatusCode::OK.into_response()
}

fn far_future_expiry() -> Result<HeaderValue, InvalidHeaderValue> {
    let expires = SystemTime::now() + Duration::from_secs(IDENTICON_EXPIRY_YEARS * SECS_PER_YEAR);
    HeaderValue::from_str(&httpdate::fmt_http_date(expires))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    use crate::identicon::{
        IdenticonError, IdenticonGenerator, MockIdenticonGenerator, PngIdenticon,
    };
    use crate::mime::{ImageSniffer, MimeError, MockMimeSniffer};
    use crate::server::router;
    use crate::store::{MemoryMessageStore, MessageStore, MockMessageStore};

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    fn app_with_store(store: impl MessageStore + 'static) -> Router {
        router::build(AppState::with_messages(Arc::new(store)))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let (parts, body) = resp.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (parts.status, parts.headers, bytes.to_vec())
    }

    #[tokio::test]
    async fn image_is_served_with_sniffed_type() {
        let store = MemoryMessageStore::new();
        store.insert_image("m1", PNG_BYTES.to_vec());

        let (status, headers, body) = get(app_with_store(store), "/messages/images?messageId=m1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(body, PNG_BYTES);
    }

    #[tokio::test]
    async fn image_missing_row_ends_without_body() {
        let (status, headers, body) =
            get(app_with_store(MemoryMessageStore::new()), "/messages/images?messageId=nope").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert!(headers.get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn image_empty_payload_ends_without_body() {
        let mut store = MockMessageStore::new();
        store
            .expect_image_payload()
            .times(1)
            .returning(|_| Ok(Some(Vec::new())));

        let (_, headers, body) = get(app_with_store(store), "/messages/images?messageId=m1").await;
        assert!(body.is_empty());
        assert!(headers.get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn image_store_failure_ends_without_body() {
        let mut store = MockMessageStore::new();
        store
            .expect_image_payload()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("database is locked".into())));

        let (status, _, body) = get(app_with_store(store), "/messages/images?messageId=m1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn missing_or_empty_param_skips_lookup() {
        for uri in [
            "/messages/images",
            "/messages/images?messageId=",
            "/messages/images?other=1",
            "/messages/audio",
            "/messages/audio?messageId=",
        ] {
            let mut store = MockMessageStore::new();
            store.expect_image_payload().never();
            store.expect_audio_payload().never();

            let (status, _, body) = get(app_with_store(store), uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn repeated_param_uses_first_value() {
        let store = MemoryMessageStore::new();
        store.insert_audio("first", b"one".to_vec());
        store.insert_audio("second", b"two".to_vec());

        let (_, _, body) = get(
            app_with_store(store),
            "/messages/audio?messageId=first&messageId=second",
        )
        .await;
        assert_eq!(body, b"one");
    }

    #[tokio::test]
    async fn unknown_image_format_falls_back_to_octet_stream() {
        let store = MemoryMessageStore::new();
        store.insert_image("m1", b"mystery".to_vec());
        let mut sniffer = MockMimeSniffer::new();
        sniffer
            .expect_detect()
            .times(1)
            .returning(|_| Err(MimeError::Unsupported));
        let state = AppState::new(Arc::new(store), Arc::new(PngIdenticon), Arc::new(sniffer));

        let (_, headers, body) = get(router::build(state), "/messages/images?messageId=m1").await;
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body, b"mystery");
    }

    #[tokio::test]
    async fn audio_is_always_aac() {
        let store = MemoryMessageStore::new();
        // Payload that would sniff as PNG; audio never sniffs.
        store.insert_audio("m1", PNG_BYTES.to_vec());

        let (_, headers, body) = get(app_with_store(store), "/messages/audio?messageId=m1").await;
        assert_eq!(headers[header::CONTENT_TYPE], "audio/aac");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(body, PNG_BYTES);
    }

    #[tokio::test]
    async fn identicon_is_cached_far_into_the_future() {
        let (status, headers, body) = get(
            router::build(AppState::default()),
            "/messages/identicons?publicKey=0x04abc",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CACHE_CONTROL], IMMUTABLE_CACHE);

        let expires = headers[header::EXPIRES].to_str().unwrap();
        let expires = httpdate::parse_http_date(expires).unwrap();
        let fifty_years = Duration::from_secs(50 * SECS_PER_YEAR);
        assert!(expires > SystemTime::now() + fifty_years);
        assert_eq!(body, PngIdenticon.generate("0x04abc").unwrap());
    }

    #[tokio::test]
    async fn identicon_generation_failure_ends_without_body() {
        let mut generator = MockIdenticonGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(IdenticonError::Generation("no renderer".into())));
        let state = AppState::new(
            Arc::new(MemoryMessageStore::new()),
            Arc::new(generator),
            Arc::new(ImageSniffer),
        );

        let (status, headers, body) =
            get(router::build(state), "/messages/identicons?publicKey=k").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert!(headers.get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn identicon_partial_output_is_still_sent() {
        let mut generator = MockIdenticonGenerator::new();
        generator.expect_generate().times(1).returning(|_| {
            Err(IdenticonError::Encoding {
                partial: vec![0x89, b'P', b'N', b'G'],
                source: std::io::Error::new(std::io::ErrorKind::WriteZero, "short write").into(),
            })
        });
        let state = AppState::new(
            Arc::new(MemoryMessageStore::new()),
            Arc::new(generator),
            Arc::new(ImageSniffer),
        );

        let (_, headers, body) = get(router::build(state), "/messages/identicons?publicKey=k").await;
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert!(headers.contains_key(header::EXPIRES));
        assert_eq!(body, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn bad_request_does_not_disturb_concurrent_requests() {
        let store = MemoryMessageStore::new();
        store.insert_image("m1", PNG_BYTES.to_vec());
        let app = app_with_store(store);

        let (bad, good) = tokio::join!(
            get(app.clone(), "/messages/images"),
            get(app.clone(), "/messages/images?messageId=m1"),
        );
        assert!(bad.2.is_empty());
        assert_eq!(good.2, PNG_BYTES);
    }

    #[test]
    fn required_param_rules() {
        let pairs = |v: &[(&str, &str)]| {
            Some(Query(
                v.iter()
                    .map(|(k, val)| (k.to_string(), val.to_string()))
                    .collect::<Vec<_>>(),
            ))
        };
        assert_eq!(required_param(None, "messageId"), None);
        assert_eq!(required_param(pairs(&[("messageId", "")]), "messageId"), None);
        assert_eq!(
            required_param(pairs(&[("x", "1"), ("messageId", "a")]), "messageId"),
            Some("a".into())
        );
    }
}
