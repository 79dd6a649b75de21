use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use model::envelope::{DeltaEnvelope, AUTHORIZATION, TRANSACTION_ID};
use reqwest::{header::CONTENT_TYPE, Client};
use url::Url;

use super::{DeltaTransport, TransportError};

const WORKING_HOURS_PATH: &str = "api/v1/working-hours";

/// Direct request/response delivery. Blocks until the workload service
/// answers or the timeout fires.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(WORKING_HOURS_PATH)?;
        Ok(HttpTransport { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeltaTransport for HttpTransport {
    async fn deliver(&self, envelope: &DeltaEnvelope) -> Result<(), TransportError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(envelope.body.clone());
        if let Some(auth) = &envelope.authorization {
            request = request.header(AUTHORIZATION, auth);
        }
        if let Some(id) = &envelope.correlation_id {
            request = request.header(TRANSACTION_ID, id.as_str());
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(err)
            }
        })?;
        let status = response.status();
        debug!(
            "Workload service answered {} for {:?}",
            status, envelope.correlation_id
        );
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use model::delta::CorrelationId;
    use parking_lot::Mutex;

    use super::*;

    type Seen = Arc<Mutex<Vec<(Option<String>, Option<String>, String)>>>;

    async fn serve(status: StatusCode, delay: Duration) -> (Url, Seen) {
        let seen: Seen = Arc::default();
        let recorder = seen.clone();
        let app = Router::new().route(
            "/api/v1/working-hours",
            post(move |headers: HeaderMap, body: String| {
                let recorder = recorder.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    recorder
                        .lock()
                        .push((header(AUTHORIZATION), header(TRANSACTION_ID), body));
                    tokio::time::sleep(delay).await;
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (Url::parse(&format!("http://{}", addr)).unwrap(), seen)
    }

    fn envelope() -> DeltaEnvelope {
        DeltaEnvelope {
            correlation_id: Some(CorrelationId::from("tx-1")),
            authorization: Some("Bearer abc".to_string()),
            body: "{}".to_string(),
        }
    }

    #[test]
    fn test_endpoint_join() {
        let base = Url::parse("http://workload:8080/svc").unwrap();
        let transport = HttpTransport::new(&base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.endpoint().as_str(),
            "http://workload:8080/svc/api/v1/working-hours"
        );
    }

    #[tokio::test]
    async fn test_delivers_with_headers() {
        let (url, seen) = serve(StatusCode::OK, Duration::ZERO).await;
        let transport = HttpTransport::new(&url, Duration::from_secs(5)).unwrap();
        transport.deliver(&envelope()).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("Bearer abc"));
        assert_eq!(seen[0].1.as_deref(), Some("tx-1"));
        assert_eq!(seen[0].2, "{}");
    }

    #[tokio::test]
    async fn test_non_success_is_error() {
        let (url, _) = serve(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
        let transport = HttpTransport::new(&url, Duration::from_secs(5)).unwrap();
        let err = transport.deliver(&envelope()).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Status(code) if code == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let (url, _) = serve(StatusCode::OK, Duration::from_secs(5)).await;
        let transport = HttpTransport::new(&url, Duration::from_millis(100)).unwrap();
        let err = transport.deliver(&envelope()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }
}
