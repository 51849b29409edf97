//! State changes over the ERP's whitelisted-method HTTP API.

use crate::remote::{ActionOutcome, RemoteCallError, StateChange};
use async_trait::async_trait;
use printbridge_core::Action;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// Calls `POST <base_url>/api/method/<method>` once per action.
///
/// Request body: `{"record_id": "...", "action": "deliver"}`. The response
/// may be the framework envelope `{"message": {"status", "detail"}}` or the
/// bare outcome.
#[derive(Debug, Clone)]
pub struct HttpStateChange {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct ActionRequest<'a> {
    record_id: &'a str,
    action: Action,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Wrapped { message: ActionOutcome },
    Bare(ActionOutcome),
}

impl HttpStateChange {
    pub fn new(base_url: &str, method: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, method)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, method: &str) -> Self {
        let url = format!(
            "{}/api/method/{}",
            base_url.trim_end_matches('/'),
            method.trim_matches('/')
        );
        Self {
            client,
            url,
            token: None,
        }
    }

    /// API token sent as `Authorization: token <key:secret>`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StateChange for HttpStateChange {
    async fn apply_action(
        &self,
        record_id: &str,
        action: Action,
    ) -> Result<ActionOutcome, RemoteCallError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&ActionRequest { record_id, action });
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteCallError::Http {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        decode_outcome(&body)
    }
}

fn decode_outcome(body: &str) -> Result<ActionOutcome, RemoteCallError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope::Wrapped { message }) | Ok(Envelope::Bare(message)) => Ok(message),
        Err(e) => Err(RemoteCallError::Decode(format!("{e}: {}", truncate(body)))),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_ERROR_BODY {
        text.chars().take(MAX_ERROR_BODY).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutcomeStatus;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const METHOD: &str = "medis.api.apply_action";

    #[test]
    fn builds_method_url() {
        let remote = HttpStateChange::new("https://erp.example.com/", METHOD);
        assert_eq!(
            remote.url(),
            "https://erp.example.com/api/method/medis.api.apply_action"
        );
    }

    #[test]
    fn decodes_both_shapes() {
        let wrapped = decode_outcome(r#"{"message":{"status":"success"}}"#).unwrap();
        assert!(wrapped.is_success());

        let bare = decode_outcome(r#"{"status":"failure","detail":"already Delivered"}"#).unwrap();
        assert_eq!(bare.status, OutcomeStatus::Failure);
        assert_eq!(bare.detail.as_deref(), Some("already Delivered"));

        assert!(matches!(
            decode_outcome("<html>oops</html>"),
            Err(RemoteCallError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn posts_action_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/method/{METHOD}")))
            .and(header("authorization", "token key:secret"))
            .and(body_json(json!({"record_id": "INV-1", "action": "deliver"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": {"status": "success"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let remote = HttpStateChange::new(&server.uri(), METHOD).with_token("key:secret");
        let outcome = remote.apply_action("INV-1", Action::Deliver).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn server_error_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(417).set_body_string("Not permitted"))
            .mount(&server)
            .await;

        let remote = HttpStateChange::new(&server.uri(), METHOD);
        let err = remote
            .apply_action("INV-2", Action::Cancel)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteCallError::Http {
                status: 417,
                body: "Not permitted".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let remote = HttpStateChange::new(&format!("http://127.0.0.1:{port}"), METHOD);
        let err = remote
            .apply_action("INV-3", Action::Return)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteCallError::Transport(_)));
    }
}
