use super::{MoveSource, SourceError};
use crate::protocol::{events, DrawReply, Health, MoveRequest, ResultPayload, StreamEvent};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use tracing::{debug, instrument};

/// The address of the move source when none is configured.
pub const DEFAULT_URL: &str = "http://localhost:8000";

/// A [`MoveSource`] that talks to the relay service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl Default for HttpSource {
    fn default() -> Self {
        HttpSource::new(DEFAULT_URL)
    }
}

impl HttpSource {
    /// Constructs [`HttpSource`] for the service at the given base address.
    pub fn new(url: impl Into<String>) -> Self {
        HttpSource {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The base address of the service.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }

    /// Checks whether the service is operational.
    #[instrument(level = "debug", skip(self), fields(url = %self.url), err)]
    pub async fn health(&self) -> Result<Health, SourceError> {
        let response = self.client.get(self.endpoint("health")).send().await?;
        Ok(success(response).await?.json().await?)
    }
}

/// Turns unsuccessful statuses into [`SourceError::Remote`].
async fn success(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(SourceError::Remote(format!("{status}: {body}")))
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

#[async_trait]
impl MoveSource for HttpSource {
    #[instrument(level = "debug", skip(self, request), fields(model = %request.model))]
    fn stream_move(&self, request: MoveRequest) -> BoxStream<'static, Result<StreamEvent, SourceError>> {
        let client = self.client.clone();
        let url = self.endpoint("get_move_stream");

        Box::pin(try_stream! {
            let response = client.post(url).json(&request).send().await?;
            let response = success(response).await?;

            if is_json(&response) {
                debug!("the move source answered without streaming");
                let data: ResultPayload = response.json().await?;
                yield StreamEvent::Result { data };
            } else {
                for await event in events(response.bytes_stream()) {
                    let event = event?;
                    let terminal = event.is_terminal();
                    yield event;

                    if terminal {
                        break;
                    }
                }
            }
        })
    }

    #[instrument(level = "debug", skip(self, request), fields(model = %request.model), err)]
    async fn draw_response(&self, request: MoveRequest) -> Result<DrawReply, SourceError> {
        let url = self.endpoint("draw_response");
        let response = self.client.post(url).json(&request).send().await?;
        Ok(success(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Action;
    use futures_util::{StreamExt, TryStreamExt};
    use std::{future::pending, time::Duration};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::{net::TcpListener, time::timeout};

    fn request() -> MoveRequest {
        MoveRequest {
            model: "o4-mini".into(),
            game_state: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
            move_history: vec![],
        }
    }

    fn json(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    fn event_stream(lines: &[&str]) -> String {
        let mut response = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n".to_string();
        for line in lines {
            response.push_str(&format!("data: {line}\n\n"));
        }

        response
    }

    /// Whether the request head and its whole body arrived.
    fn is_complete(request: &[u8]) -> bool {
        let request = String::from_utf8_lossy(request);
        let Some((head, body)) = request.split_once("\r\n\r\n") else {
            return false;
        };

        let length = head
            .lines()
            .find_map(|l| {
                let l = l.to_ascii_lowercase();
                Some(l.strip_prefix("content-length:")?.trim().parse().unwrap_or(0))
            })
            .unwrap_or(0);

        body.len() >= length
    }

    /// Answers a single request with a canned response, then holds the connection open.
    async fn serve(response: String) -> HttpSource {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0; 1024];

            while !is_complete(&request) {
                match socket.read(&mut buffer).await.unwrap() {
                    0 => break,
                    n => request.extend_from_slice(&buffer[..n]),
                }
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            pending::<()>().await;
        });

        HttpSource {
            client: Client::builder().no_proxy().build().unwrap(),
            url: format!("http://{address}"),
        }
    }

    async fn collect(source: &HttpSource) -> Result<Vec<StreamEvent>, SourceError> {
        let events = source.stream_move(request()).try_collect();
        timeout(Duration::from_secs(5), events).await.unwrap()
    }

    #[test]
    fn endpoints_are_resolved_against_the_base_address() {
        let source = HttpSource::new("http://relay.local:8000/");
        assert_eq!(source.url(), "http://relay.local:8000");
        assert_eq!(
            source.endpoint("get_move_stream"),
            "http://relay.local:8000/get_move_stream"
        );
    }

    #[test]
    fn defaults_to_a_local_address() {
        assert_eq!(HttpSource::default().url(), DEFAULT_URL);
    }

    #[tokio::test]
    async fn event_streams_are_decoded_until_the_result() {
        let source = serve(event_stream(&[
            r#"{"type": "thinking_start"}"#,
            r#"{"type": "thinking_delta", "content": "hmm"}"#,
            r#"{"type": "result", "data": {"move": "e4", "thinking_tokens": 7}}"#,
            r#"{"type": "thinking_delta", "content": "late"}"#,
        ]))
        .await;

        assert_eq!(
            collect(&source).await.unwrap(),
            vec![
                StreamEvent::ThinkingStart,
                StreamEvent::ThinkingDelta {
                    content: "hmm".into()
                },
                StreamEvent::Result {
                    data: ResultPayload {
                        san: Some("e4".into()),
                        action: None,
                        thinking_tokens: Some(7),
                    }
                },
            ]
        );
    }

    #[tokio::test]
    async fn error_events_end_the_stream() {
        let source = serve(event_stream(&[
            r#"{"type": "error", "message": "rate limited"}"#,
            r#"{"type": "result", "data": {"move": "e4"}}"#,
        ]))
        .await;

        assert_eq!(
            collect(&source).await.unwrap(),
            vec![StreamEvent::Error {
                message: "rate limited".into()
            }]
        );
    }

    #[tokio::test]
    async fn json_bodies_are_surfaced_as_a_single_result() {
        let source = serve(json("200 OK", r#"{"action": "resign", "thinking_tokens": 3}"#)).await;

        assert_eq!(
            collect(&source).await.unwrap(),
            vec![StreamEvent::Result {
                data: ResultPayload {
                    san: None,
                    action: Some(Action::Resign),
                    thinking_tokens: Some(3),
                }
            }]
        );
    }

    #[tokio::test]
    async fn unsuccessful_statuses_are_remote_errors() {
        let source = serve(json("500 Internal Server Error", r#"{"detail": "boom"}"#)).await;

        let mut events = source.stream_move(request());
        match timeout(Duration::from_secs(5), events.next()).await.unwrap() {
            Some(Err(SourceError::Remote(m))) => {
                assert!(m.contains("500"), "{m}");
                assert!(m.contains("boom"), "{m}");
            }

            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn draw_responses_are_parsed() {
        let source = serve(json("200 OK", r#"{"action": "draw_accept", "thinking_tokens": 2}"#)).await;

        let reply = timeout(Duration::from_secs(5), source.draw_response(request()))
            .await
            .unwrap()
            .unwrap();

        assert!(reply.accepts());
        assert_eq!(reply.thinking_tokens, Some(2));
    }

    #[tokio::test]
    async fn health_reports_the_service_status() {
        let source = serve(json("200 OK", r#"{"status": "ok", "message": "ready"}"#)).await;

        let health = timeout(Duration::from_secs(5), source.health())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.message, "ready");
    }
}
