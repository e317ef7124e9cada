//! SMS delivery through a Twilio-compatible REST API.
//!
//! One form-encoded POST per message to
//! `{base_url}/2010-04-01/Accounts/{account_sid}/Messages.json`,
//! authenticated with HTTP basic auth (account SID, auth token).

use crate::error::{NotifyError, NotifyResult};
use crate::notifier::{BoxFuture, Notifier};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
/// Destination address.
pub const ENV_TO: &str = "TO_PHONE_NUMBER";
/// Sender address.
pub const ENV_FROM: &str = "TWILIO_PHONE_NUMBER";

/// Provider credentials and addresses.
#[derive(Clone, PartialEq, Eq)]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
}

impl fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl SmsCredentials {
    /// Read credentials through `lookup`; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> NotifyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(NotifyError::MissingCredential(key))
        };

        Ok(Self {
            account_sid: get(ENV_ACCOUNT_SID)?,
            auth_token: get(ENV_AUTH_TOKEN)?,
            to: get(ENV_TO)?,
            from: get(ENV_FROM)?,
        })
    }
}

pub struct SmsNotifier {
    client: Client,
    messages_url: String,
    credentials: SmsCredentials,
}

impl SmsNotifier {
    pub fn new(base_url: &str, credentials: SmsCredentials, timeout: Duration) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            messages_url: messages_url(base_url, &credentials.account_sid),
            credentials,
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    async fn send(&self, body: &str) -> NotifyResult<()> {
        let params = [
            ("To", self.credentials.to.as_str()),
            ("From", self.credentials.from.as_str()),
            ("Body", body),
        ];

        let started = Instant::now();
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout(started.elapsed().as_millis() as u64)
                } else {
                    NotifyError::HttpClient(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Provider accepted message");
        info!(to = %self.credentials.to, "SMS sent");
        Ok(())
    }
}

impl Notifier for SmsNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, NotifyResult<()>> {
        Box::pin(self.send(message))
    }

    fn name(&self) -> &'static str {
        "sms"
    }
}

fn messages_url(base_url: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        base_url.trim_end_matches('/'),
        account_sid
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn credentials() -> SmsCredentials {
        SmsCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from: "+15550001111".to_string(),
            to: "+15552223333".to_string(),
        }
    }

    #[test]
    fn test_messages_url() {
        assert_eq!(
            messages_url("https://api.twilio.com/", "AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_credentials_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_ACCOUNT_SID, "AC123"),
            (ENV_AUTH_TOKEN, "secret"),
            (ENV_TO, "+15552223333"),
            (ENV_FROM, "+15550001111"),
        ]
        .into_iter()
        .collect();

        let creds = SmsCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds, credentials());
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_credentials_missing_or_empty() {
        let result = SmsCredentials::from_lookup(|k| {
            (k != ENV_AUTH_TOKEN).then(|| "x".to_string())
        });
        assert!(matches!(
            result,
            Err(NotifyError::MissingCredential(ENV_AUTH_TOKEN))
        ));

        let result = SmsCredentials::from_lookup(|_| Some("  ".to_string()));
        assert!(matches!(result, Err(NotifyError::MissingCredential(_))));
    }

    /// Serve exactly one HTTP exchange, returning the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let (base_url, server) = serve_once("HTTP/1.1 201 Created", r#"{"sid":"SM1"}"#).await;
        let notifier = SmsNotifier::new(&base_url, credentials(), Duration::from_secs(5)).unwrap();

        notifier
            .notify("A buy order worth of 12 Bitcoin was made")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json HTTP/1.1"));
        // base64("AC123:secret")
        assert!(request.contains("QUMxMjM6c2VjcmV0"));
        assert!(request.contains("To=%2B15552223333"));
        assert!(request.contains("From=%2B15550001111"));
        assert!(request.contains("Body=A+buy+order+worth+of+12+Bitcoin+was+made"));
    }

    #[tokio::test]
    async fn test_send_non_success_is_rejected() {
        let (base_url, server) =
            serve_once("HTTP/1.1 400 Bad Request", r#"{"message":"invalid To"}"#).await;
        let notifier = SmsNotifier::new(&base_url, credentials(), Duration::from_secs(5)).unwrap();

        match notifier.notify("hello").await {
            Err(NotifyError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid To"));
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
        server.await.unwrap();
    }
}
