//! BoxLlmClient -- object-safe dynamic dispatch wrapper for LlmClient.
//!
//! 1. Define an object-safe `LlmClientDyn` trait with boxed futures
//! 2. Blanket-impl `LlmClientDyn` for all `T: LlmClient`
//! 3. `BoxLlmClient` wraps `Box<dyn LlmClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use bizbrain_types::llm::LlmError;
use serde_json::Value;

use super::client::LlmClient;

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, LlmError>> + Send + 'a>>;

/// Object-safe version of [`LlmClient`] with boxed futures.
pub trait LlmClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
        temperature: f64,
        max_tokens: u32,
    ) -> BoxFut<'a, String>;

    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFut<'a, Vec<f32>>;

    fn sentiment_boxed<'a>(&'a self, text: &'a str, model: &'a str) -> BoxFut<'a, Value>;

    fn entities_boxed<'a>(&'a self, text: &'a str, model: &'a str) -> BoxFut<'a, Value>;

    fn summarize_boxed<'a>(
        &'a self,
        text: &'a str,
        model: &'a str,
        max_length: u32,
    ) -> BoxFut<'a, Value>;
}

/// Blanket implementation: any `LlmClient` automatically implements `LlmClientDyn`.
impl<T: LlmClient> LlmClientDyn for T {
    fn name(&self) -> &str {
        LlmClient::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
        temperature: f64,
        max_tokens: u32,
    ) -> BoxFut<'a, String> {
        Box::pin(self.complete(prompt, model, temperature, max_tokens))
    }

    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFut<'a, Vec<f32>> {
        Box::pin(self.embed(text))
    }

    fn sentiment_boxed<'a>(&'a self, text: &'a str, model: &'a str) -> BoxFut<'a, Value> {
        Box::pin(self.sentiment(text, model))
    }

    fn entities_boxed<'a>(&'a self, text: &'a str, model: &'a str) -> BoxFut<'a, Value> {
        Box::pin(self.entities(text, model))
    }

    fn summarize_boxed<'a>(
        &'a self,
        text: &'a str,
        model: &'a str,
        max_length: u32,
    ) -> BoxFut<'a, Value> {
        Box::pin(self.summarize(text, model, max_length))
    }
}

/// Type-erased language-model client.
///
/// Since `LlmClient` uses RPITIT, it cannot be used as a trait object directly.
/// `BoxLlmClient` provides equivalent methods that delegate to the inner
/// `LlmClientDyn` trait object.
pub struct BoxLlmClient {
    inner: Box<dyn LlmClientDyn + Send + Sync>,
}

impl BoxLlmClient {
    /// Wrap a concrete `LlmClient` in a type-erased box.
    pub fn new<T: LlmClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.inner
            .complete_boxed(prompt, model, temperature, max_tokens)
            .await
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.inner.embed_boxed(text).await
    }

    pub async fn sentiment(&self, text: &str, model: &str) -> Result<Value, LlmError> {
        self.inner.sentiment_boxed(text, model).await
    }

    pub async fn entities(&self, text: &str, model: &str) -> Result<Value, LlmError> {
        self.inner.entities_boxed(text, model).await
    }

    pub async fn summarize(
        &self,
        text: &str,
        model: &str,
        max_length: u32,
    ) -> Result<Value, LlmError> {
        self.inner.summarize_boxed(text, model, max_length).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoClient;

    impl LlmClient for EchoClient {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            prompt: &str,
            model: &str,
            _temperature: f64,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(format!("{model}:{prompt}"))
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![text.len() as f32])
        }

        async fn sentiment(&self, _text: &str, _model: &str) -> Result<Value, LlmError> {
            Ok(json!({ "label": "neutral" }))
        }

        async fn entities(&self, _text: &str, _model: &str) -> Result<Value, LlmError> {
            Err(LlmError::Unsupported("entities".to_string()))
        }

        async fn summarize(
            &self,
            text: &str,
            _model: &str,
            max_length: u32,
        ) -> Result<Value, LlmError> {
            Ok(json!({ "summary": text, "max_length": max_length }))
        }
    }

    #[tokio::test]
    async fn box_client_delegates() {
        let client = BoxLlmClient::new(EchoClient);
        assert_eq!(client.name(), "echo");
        assert_eq!(
            client.complete("hi", "m", 0.7, 10).await.unwrap(),
            "m:hi"
        );
        assert_eq!(client.embed("abc").await.unwrap(), vec![3.0]);
        assert_eq!(
            client.summarize("x", "m", 50).await.unwrap()["max_length"],
            json!(50)
        );
        assert!(client.entities("x", "m").await.is_err());
    }
}
