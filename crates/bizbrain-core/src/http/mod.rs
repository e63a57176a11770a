//! Outbound HTTP collaborator used by API tasks.
//!
//! Same shape as the language-model port: an RPITIT trait for implementations
//! plus a boxed wrapper for dynamic dispatch.

use std::future::Future;
use std::pin::Pin;

use bizbrain_types::http::{HttpError, HttpRequest, HttpResponse};

/// Sends a single HTTP request. No client-side retries; the engine's guard
/// owns the retry policy.
pub trait HttpClient: Send + Sync {
    fn request(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Object-safe version of [`HttpClient`].
pub trait HttpClientDyn: Send + Sync {
    fn request_boxed(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>>;
}

impl<T: HttpClient> HttpClientDyn for T {
    fn request_boxed(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        Box::pin(self.request(request))
    }
}

/// Type-erased HTTP client.
pub struct BoxHttpClient {
    inner: Box<dyn HttpClientDyn + Send + Sync>,
}

impl BoxHttpClient {
    pub fn new<T: HttpClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.inner.request_boxed(request).await
    }
}
