//! Cliente HTTP hacia el proveedor de datos
//!
//! `HttpClientAdapter` valida la URL, reintenta los fallos de transporte y
//! clasifica el resultado. La petición en sí pasa por el trait `Transport`
//! para poder sustituirla en tests.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::utils::errors::FetchError;

/// Intentos totales ante fallos de transporte
pub const MAX_ATTEMPTS: u32 = 3;
/// Pausa entre intentos
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Respuesta cruda del proveedor
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fallo de conexión, timeout o lectura del cuerpo
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Una petición GET sin reintentos ni clasificación
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportFailure>;
}

/// Contrato del cliente HTTP usado por el servicio del calendario
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Value, FetchError>;
}

/// Transporte basado en reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("RaceSchedule/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportFailure> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure(format!("Error leyendo el cuerpo: {}", e)))?;

        Ok(RawResponse { status, body })
    }
}

/// Política de reintentos
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

pub struct HttpClientAdapter<T: Transport = ReqwestTransport> {
    transport: T,
    retry: RetryPolicy,
}

impl HttpClientAdapter<ReqwestTransport> {
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(ReqwestTransport::new(timeout)?))
    }
}

impl<T: Transport> HttpClientAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self::with_retry(transport, RetryPolicy::default())
    }

    pub fn with_retry(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    async fn send_with_retry(&self, url: &Url) -> Result<RawResponse, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.get(url).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "⚠️ Intento {}/{} fallido para {}: {}; reintentando en {:?}",
                        attempt, max_attempts, url, e, self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("❌ Error en la petición HTTP a {} tras {} intentos: {}", url, attempt, e);
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        attempts: attempt,
                        message: e.0,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl<T: Transport> HttpClient for HttpClientAdapter<T> {
    async fn get(&self, url: &str) -> Result<Value, FetchError> {
        let parsed = parse_url(url).map_err(|e| {
            error!("❌ URL no válida '{}': {}", url, e);
            FetchError::InvalidInput { url: url.to_string() }
        })?;

        info!("🌐 GET {}", parsed);
        let response = self.send_with_retry(&parsed).await?;
        debug!("📡 Response status: {}", response.status);

        if !response.is_success() {
            error!("❌ Respuesta no exitosa {} de {}: {}", response.status, url, response.body);
            return Err(FetchError::Upstream {
                url: url.to_string(),
                status: response.status,
                detail: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| {
            error!("❌ Cuerpo JSON inválido de {}: {}", url, e);
            FetchError::Upstream {
                url: url.to_string(),
                status: response.status,
                detail: format!("JSON inválido: {}", e),
            }
        })
    }
}

/// Solo URLs absolutas http(s) con host
fn parse_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url.trim()).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("esquema no soportado: {}", other)),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("la URL no tiene host".to_string());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const TEST_URL: &str = "https://api.example.com/data";

    /// Transporte con respuestas programadas
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawResponse, TransportFailure>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, TransportFailure>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    fn calls(client: &HttpClientAdapter<ScriptedTransport>) -> u32 {
        client.transport.calls.load(Ordering::SeqCst)
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &Url) -> Result<RawResponse, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure("sin respuestas".to_string())))
        }
    }

    fn ok(status: u16, body: &str) -> Result<RawResponse, TransportFailure> {
        Ok(RawResponse { status, body: body.to_string() })
    }

    fn connection_refused() -> Result<RawResponse, TransportFailure> {
        Err(TransportFailure("connection refused".to_string()))
    }

    #[tokio::test]
    async fn test_valid_url_returns_json() {
        let transport = ScriptedTransport::new(vec![ok(200, r#"{"message":"Success"}"#)]);
        let client = HttpClientAdapter::new(transport);

        let body = client.get(TEST_URL).await.unwrap();
        assert_eq!(body, json!({"message": "Success"}));
        assert_eq!(calls(&client), 1);
    }

    #[tokio::test]
    async fn test_invalid_urls_fail_without_network_calls() {
        let transport = ScriptedTransport::new(vec![]);
        let client = HttpClientAdapter::new(transport);

        for url in ["invalid-url", "", "ftp://example.com/file", "http://", "mailto:a@b.com", "/api/f1"] {
            let err = client.get(url).await.unwrap_err();
            assert_eq!(err, FetchError::InvalidInput { url: url.to_string() }, "url: {url}");
        }
        assert_eq!(calls(&client), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let transport = ScriptedTransport::new(vec![
            connection_refused(),
            connection_refused(),
            ok(200, r#"{"MRData":{}}"#),
        ]);
        let client = HttpClientAdapter::new(transport);

        let body = client.get(TEST_URL).await.unwrap();
        assert_eq!(body, json!({"MRData": {}}));
        assert_eq!(calls(&client), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_between_attempts() {
        let transport = ScriptedTransport::new(vec![connection_refused(), ok(200, "{}")]);
        let client = HttpClientAdapter::new(transport);

        let started = tokio::time::Instant::now();
        client.get(TEST_URL).await.unwrap();
        assert!(started.elapsed() >= RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_surfaces_after_three_attempts() {
        let transport = ScriptedTransport::new(vec![
            connection_refused(),
            connection_refused(),
            connection_refused(),
            ok(200, "{}"),
        ]);
        let client = HttpClientAdapter::new(transport);

        let err = client.get(TEST_URL).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Transport {
                url: TEST_URL.to_string(),
                attempts: 3,
                message: "connection refused".to_string(),
            }
        );
        assert_eq!(calls(&client), 3);
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_retried() {
        let transport = ScriptedTransport::new(vec![ok(404, r#"{"error":"Not Found"}"#), ok(200, "{}")]);
        let client = HttpClientAdapter::new(transport);

        let err = client.get(TEST_URL).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Upstream {
                url: TEST_URL.to_string(),
                status: 404,
                detail: r#"{"error":"Not Found"}"#.to_string(),
            }
        );
        assert_eq!(calls(&client), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![ok(503, "busy"), ok(200, "{}")]);
        let client = HttpClientAdapter::new(transport);

        assert!(matches!(
            client.get(TEST_URL).await,
            Err(FetchError::Upstream { status: 503, .. })
        ));
        assert_eq!(calls(&client), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_upstream_error() {
        let transport = ScriptedTransport::new(vec![ok(200, "<html>oops</html>")]);
        let client = HttpClientAdapter::new(transport);

        assert!(matches!(
            client.get(TEST_URL).await,
            Err(FetchError::Upstream { status: 200, .. })
        ));
        assert_eq!(calls(&client), 1);
    }

    #[test]
    fn test_parse_url_accepts_http_and_https() {
        assert!(parse_url("https://ergast.com/api/f1/current.json").is_ok());
        assert!(parse_url("http://localhost:8080/api").is_ok());
        assert!(parse_url("https://").is_err());
    }
}
