//! Fetches rendered invoice PDFs from the ERP.

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("render returned HTTP {0}")]
    Status(u16),
    #[error("render response has no pdf_base64")]
    MissingPdf,
}

/// Client for the silent-print `create_pdf` method.
#[derive(Debug, Clone)]
pub struct Renderer {
    client: reqwest::Client,
    url: String,
    print_format: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    doctype: &'a str,
    name: &'a str,
    silent_print_format: &'a str,
    no_letterhead: u8,
    #[serde(rename = "_lang")]
    lang: &'a str,
}

#[derive(Deserialize)]
struct RenderResponse {
    message: Option<RenderedPdf>,
}

#[derive(Deserialize)]
struct RenderedPdf {
    pdf_base64: Option<String>,
}

impl Renderer {
    /// `timeout` bounds each render request from connect to last byte.
    pub fn new(
        base_url: &str,
        method: &str,
        print_format: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/api/method/{}", base_url.trim_end_matches('/'), method),
            print_format: print_format.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Render one sales invoice; returns the PDF as base64.
    pub async fn invoice_pdf(&self, invoice: &str) -> Result<String, RenderError> {
        let mut request = self.client.post(&self.url).json(&RenderRequest {
            doctype: "Sales Invoice",
            name: invoice,
            silent_print_format: &self.print_format,
            no_letterhead: 0,
            lang: "en",
        });
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RenderError::Status(response.status().as_u16()));
        }
        let body: RenderResponse = response.json().await?;
        body.message
            .and_then(|m| m.pdf_base64)
            .filter(|pdf| !pdf.is_empty())
            .ok_or(RenderError::MissingPdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const METHOD: &str = "silent_print.utils.print_format.create_pdf";

    fn renderer(server: &MockServer, timeout: Duration) -> Renderer {
        Renderer::new(&server.uri(), METHOD, "Medis Split Invoice", timeout).unwrap()
    }

    #[tokio::test]
    async fn fetches_invoice_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/method/{METHOD}")))
            .and(body_partial_json(json!({
                "doctype": "Sales Invoice",
                "name": "INV-1",
                "silent_print_format": "Medis Split Invoice",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": {"pdf_base64": "JVBERi0="}})),
            )
            .mount(&server)
            .await;

        let renderer = renderer(&server, Duration::from_secs(5));
        assert_eq!(renderer.invoice_pdf("INV-1").await.unwrap(), "JVBERi0=");
    }

    #[tokio::test]
    async fn missing_pdf_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": {}})))
            .mount(&server)
            .await;

        let renderer = renderer(&server, Duration::from_secs(5));
        assert!(matches!(
            renderer.invoice_pdf("INV-2").await,
            Err(RenderError::MissingPdf)
        ));
    }

    #[tokio::test]
    async fn slow_render_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": {"pdf_base64": "JVBERi0="}}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let renderer = renderer(&server, Duration::from_millis(200));
        match renderer.invoice_pdf("INV-3").await {
            Err(RenderError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
