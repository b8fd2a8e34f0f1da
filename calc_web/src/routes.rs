//! HTTP routes.
//!
//! Handlers translate form posts into core calls and render the outcome.
//! Anything that touches the disk or the network runs on the blocking pool.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use calc_core::calculations::estimate::estimate;
use calc_core::calculations::EstimateForm;
use calc_core::contact::ContactForm;
use calc_core::errors::{CalcError, CalcResult};
use calc_core::session::{parse_date_stamp, LogKey, SessionContext};
use calc_core::session_log::LogRecord;
use chrono::Utc;
use serde::Deserialize;
use tracing::Instrument;

use crate::pages::{self, CalculatorView, ContactView, HistoryView};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(calculator_page).post(calculate))
        .route("/contact", get(contact_page).post(send_contact))
        .route("/info", get(info_page))
        .route("/mijn-berekeningen", get(history_page))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), trace_requests))
        .with_state(state)
}

/// Run blocking work off the async executor
async fn blocking<T, F>(work: F) -> CalcResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CalcResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CalcError::internal(format!("blocking task failed: {}", e)))?
}

/// Page response, handing a freshly minted session to the client
fn respond(status: StatusCode, body: String, state: &AppState, session: &SessionContext) -> Response {
    let mut response = (status, Html(body)).into_response();
    if session.is_new() {
        if let Some((name, value)) = session.session().and_then(|id| state.cookies.set_cookie(id)) {
            response.headers_mut().append(name, value);
        }
    }
    response
}

async fn trace_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| state.next_request_id());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        )
    });
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn calculator_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::calculator(&CalculatorView {
        catalog: &state.catalog,
        form: &EstimateForm::default(),
        result: None,
        error: None,
    }))
}

async fn calculate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<EstimateForm>,
) -> Response {
    let mut session = state.cookies.session_from(&headers);

    let result = match estimate(&form, &state.catalog) {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!(code = e.error_code(), error = %e, "estimate rejected");
            let body = pages::calculator(&CalculatorView {
                catalog: &state.catalog,
                form: &form,
                result: None,
                error: Some(pages::user_message(&e)),
            });
            return respond(StatusCode::OK, body, &state, &session);
        }
    };

    state.metrics.record_material(&result.material);

    let record = LogRecord::now(result.clone());
    let key = LogKey::new(session.ensure().clone(), record.timestamp.date_naive());
    let store = state.store.clone();
    let appended = blocking(move || store.append(&key, &record)).await;

    let (status, error) = match appended {
        Ok(()) => {
            tracing::debug!(material = %result.material, price = result.price, "estimate logged");
            (StatusCode::OK, None)
        }
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "failed to log estimate");
            (StatusCode::INTERNAL_SERVER_ERROR, Some(pages::user_message(&e)))
        }
    };

    let body = pages::calculator(&CalculatorView {
        catalog: &state.catalog,
        form: &form,
        result: Some(&result),
        error,
    });
    respond(status, body, &state, &session)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    datum: Option<String>,
}

async fn history_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let session = state.cookies.session_from(&headers);
    let Some(id) = session.session().cloned() else {
        return Html(pages::history(&HistoryView::NoSession)).into_response();
    };

    let date = match query.datum.as_deref() {
        Some(raw) => match parse_date_stamp(raw) {
            Ok(date) => date,
            Err(e) => {
                let body = pages::history(&HistoryView::Failed(pages::user_message(&e)));
                return (StatusCode::BAD_REQUEST, Html(body)).into_response();
            }
        },
        None => Utc::now().date_naive(),
    };

    let key = LogKey::new(id, date);
    let store = state.store.clone();
    match blocking(move || store.history(&key)).await {
        Ok(records) => Html(pages::history(&HistoryView::Records {
            date: date.format("%d-%m-%Y").to_string(),
            records: &records,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "failed to read history");
            let body = pages::history(&HistoryView::Failed(pages::user_message(&e)));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
        }
    }
}

async fn contact_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::contact(&ContactView {
        success: false,
        error: None,
        email: "",
        message: "",
        recaptcha_site_key: state.recaptcha_site_key.as_deref(),
    }))
}

async fn send_contact(State(state): State<Arc<AppState>>, Form(form): Form<ContactForm>) -> Response {
    let notifier = state.notifier.clone();
    let submitted = form.clone();
    let outcome = blocking(move || notifier.submit(&submitted, None)).await;

    let (status, error) = match outcome {
        Ok(mail) => {
            tracing::info!(reply_to = %mail.reply_to, "contact message sent");
            (StatusCode::OK, None)
        }
        Err(e) => {
            let status = match &e {
                CalcError::ValidationError { field, .. } if field == "honeypot" => {
                    tracing::warn!("contact form rejected by honeypot");
                    StatusCode::OK
                }
                e if e.is_user_error() => {
                    tracing::debug!(error = %e, "contact form rejected");
                    StatusCode::OK
                }
                CalcError::DeliveryError { .. } => {
                    tracing::error!(error = %e, "contact mail delivery failed");
                    StatusCode::BAD_GATEWAY
                }
                _ => {
                    tracing::error!(error = %e, "contact form failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Some(pages::user_message(&e)))
        }
    };

    // A successful send clears the form
    let keep = error.is_some();
    let body = pages::contact(&ContactView {
        success: !keep,
        error,
        email: if keep { form.email.as_deref().unwrap_or("") } else { "" },
        message: if keep { form.message.as_deref().unwrap_or("") } else { "" },
        recaptcha_site_key: state.recaptcha_site_key.as_deref(),
    });
    (status, Html(body)).into_response()
}

async fn info_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::info(&state.catalog, &state.metrics.snapshot()))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(pages::not_found())).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::Request as HttpRequest;
    use calc_core::contact::{HumanVerifier, MailTransport, OutgoingMail};
    use calc_core::materials::MaterialCatalog;
    use calc_core::metrics::{MaterialUsageCounter, UsageMetrics};
    use calc_core::session_log::{LogStore, MemoryLogStore};
    use calc_core::ContactNotifier;
    use tower::ServiceExt;

    use super::*;
    use crate::cookies::SessionCookies;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
        fail: bool,
    }

    impl MailTransport for RecordingTransport {
        fn send(&self, mail: &OutgoingMail) -> CalcResult<()> {
            if self.fail {
                return Err(CalcError::delivery("connection refused"));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    /// Store whose disk is always unwritable
    struct UnwritableStore;

    impl LogStore for UnwritableStore {
        fn append(&self, key: &LogKey, _record: &LogRecord) -> CalcResult<()> {
            Err(CalcError::file_error("open for append", key.file_stem(), "read-only file system"))
        }

        fn history(&self, _key: &LogKey) -> CalcResult<Vec<LogRecord>> {
            Ok(Vec::new())
        }
    }

    struct FixedVerifier(bool);

    impl HumanVerifier for FixedVerifier {
        fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> CalcResult<bool> {
            Ok(self.0)
        }
    }

    struct Harness {
        state: Arc<AppState>,
        store: Arc<MemoryLogStore>,
        metrics: Arc<MaterialUsageCounter>,
        transport: Arc<RecordingTransport>,
    }

    fn harness_with(transport: RecordingTransport, verifier: Option<bool>) -> Harness {
        let store = Arc::new(MemoryLogStore::new());
        let metrics = Arc::new(MaterialUsageCounter::new());
        let transport = Arc::new(transport);
        let mut notifier = ContactNotifier::new("eigenaar@example.com", transport.clone());
        if let Some(accept) = verifier {
            notifier = notifier.with_verifier(Arc::new(FixedVerifier(accept)));
        }
        let state = Arc::new(AppState::new(
            MaterialCatalog::default(),
            store.clone(),
            metrics.clone(),
            notifier,
            SessionCookies::from_secret("test secret"),
        ));
        Harness {
            state,
            store,
            metrics,
            transport,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingTransport::default(), None)
    }

    fn post(uri: &str, form: &str, cookie: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(form.to_string())).unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request) -> (StatusCode, HeaderMap, String) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn session_cookie(headers: &HeaderMap) -> String {
        let value = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        value.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_calculate_logs_and_sets_cookie() {
        let h = harness();
        let (status, headers, body) = send(
            &h.state,
            post("/", "onderdeel=dak&materiaal=hout&lengte=4&breedte=2.5&marge=5&eenheid=m", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("10.00"));
        assert!(body.contains("105.00"));
        assert!(body.contains("157.50"));
        assert!(session_cookie(&headers).starts_with("sessie="));
        assert!(headers.contains_key(REQUEST_ID_HEADER));
        assert_eq!(h.store.total_records(), 1);
        assert_eq!(h.metrics.count("hout"), 1);
    }

    #[tokio::test]
    async fn test_centimeter_input_converted() {
        let h = harness();
        let (status, _, body) = send(
            &h.state,
            post("/", "materiaal=metaal&lengte=250&breedte=150&eenheid=cm", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("3.75"));
    }

    #[tokio::test]
    async fn test_log_failure_still_shows_result() {
        let transport: Arc<RecordingTransport> = Arc::new(RecordingTransport::default());
        let state = Arc::new(AppState::new(
            MaterialCatalog::default(),
            Arc::new(UnwritableStore),
            Arc::new(MaterialUsageCounter::new()),
            ContactNotifier::new("eigenaar@example.com", transport),
            SessionCookies::from_secret("test secret"),
        ));

        let (status, _, body) = send(
            &state,
            post("/", "materiaal=hout&lengte=4&breedte=2.5&marge=5", None),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("kon niet worden opgeslagen"));
        assert!(body.contains("105.00"));
        assert!(body.contains("157.50"));
    }

    #[tokio::test]
    async fn test_overflowing_dimensions_write_nothing() {
        let h = harness();
        let (status, _, body) = send(
            &h.state,
            post("/", "materiaal=hout&lengte=1e200&breedte=1e200", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Ongeldige invoer voor lengte, breedte, hoogte of helling."));
        assert_eq!(h.store.total_records(), 0);
    }

    #[tokio::test]
    async fn test_unknown_material_writes_nothing() {
        let h = harness();
        let (status, headers, body) = send(
            &h.state,
            post("/", "materiaal=goud&lengte=4&breedte=2.5", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Onbekend materiaal geselecteerd."));
        assert!(!headers.contains_key(SET_COOKIE));
        assert_eq!(h.store.total_records(), 0);
        assert!(h.metrics.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_number_keeps_form() {
        let h = harness();
        let (_, _, body) = send(&h.state, post("/", "materiaal=hout&lengte=vier&breedte=2", None)).await;
        assert!(body.contains("Ongeldige invoer voor lengte, breedte, hoogte of helling."));
        assert!(body.contains(r#"name="lengte" value="vier""#));
        assert_eq!(h.store.total_records(), 0);
    }

    #[tokio::test]
    async fn test_history_in_submission_order() {
        let h = harness();
        let (_, headers, _) = send(
            &h.state,
            post("/", "onderdeel=eerste&materiaal=hout&lengte=1&breedte=1", None),
        )
        .await;
        let cookie = session_cookie(&headers);

        let (_, headers, _) = send(
            &h.state,
            post("/", "onderdeel=tweede&materiaal=kunststof&lengte=2&breedte=2", Some(&cookie)),
        )
        .await;
        assert!(!headers.contains_key(SET_COOKIE));

        let (status, _, body) = send(&h.state, get_req("/mijn-berekeningen", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        let first = body.find("eerste").unwrap();
        let second = body.find("tweede").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_history_without_session() {
        let h = harness();
        let (status, _, body) = send(&h.state, get_req("/mijn-berekeningen", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("geen sessie"));
    }

    #[tokio::test]
    async fn test_history_rejects_bad_date() {
        let h = harness();
        let (_, headers, _) = send(&h.state, post("/", "materiaal=hout&lengte=1&breedte=1", None)).await;
        let cookie = session_cookie(&headers);

        let (status, _, body) = send(&h.state, get_req("/mijn-berekeningen?datum=gisteren", Some(&cookie))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("JJJJMMDD"));

        let (status, _, body) = send(&h.state, get_req("/mijn-berekeningen?datum=20000101", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Geen berekeningen"));
    }

    #[tokio::test]
    async fn test_contact_sends_mail() {
        let h = harness();
        let (status, _, body) = send(
            &h.state,
            post("/contact", "email=klant%40example.com&message=Hallo%20daar&honeypot=", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Bedankt"));
        let sent = h.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "eigenaar@example.com");
        assert_eq!(sent[0].reply_to, "klant@example.com");
    }

    #[tokio::test]
    async fn test_contact_honeypot_never_dispatches() {
        let h = harness();
        let (status, _, body) = send(
            &h.state,
            post("/contact", "email=bot%40example.com&message=spam&honeypot=gevuld", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Spam detectie"));
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contact_missing_fields_preserves_input() {
        let h = harness();
        let (_, _, body) = send(&h.state, post("/contact", "email=klant%40example.com&message=", None)).await;
        assert!(body.contains("Zorg ervoor dat zowel e-mailadres als bericht zijn ingevuld."));
        assert!(body.contains("klant@example.com"));
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contact_delivery_failure() {
        let h = harness_with(
            RecordingTransport {
                fail: true,
                ..Default::default()
            },
            None,
        );
        let (status, _, body) = send(
            &h.state,
            post("/contact", "email=klant%40example.com&message=Hallo", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Verzenden mislukt"));
    }

    #[tokio::test]
    async fn test_contact_rejected_verification() {
        let h = harness_with(RecordingTransport::default(), Some(false));
        let (status, _, body) = send(
            &h.state,
            post(
                "/contact",
                "email=klant%40example.com&message=Hallo&g-recaptcha-response=token",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Verificatie mislukt"));
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_info_lists_usage() {
        let h = harness();
        h.metrics.record_material("metaal");
        let (status, _, body) = send(&h.state, get_req("/info", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<tr><td>metaal</td><td>20</td><td>1</td></tr>"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let h = harness();
        let (status, _, _) = send(&h.state, get_req("/bestaat-niet", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let h = harness();
        let request = HttpRequest::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "req-test")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(&h.state, request).await;
        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-test");
    }
}
