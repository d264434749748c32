pub mod azure_openai;
pub mod openai;

use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chat_completions::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionStream};
use crate::sse::{SseEvent, SseParser};
use crate::{Error, Result};

fn json_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    headers
}

async fn post_chat_request(
    http_client: &reqwest::Client,
    url: String,
    headers: HeaderMap,
    request: &ChatCompletionRequest,
) -> Result<reqwest::Response> {
    let response = http_client
        .post(url)
        .headers(json_headers(headers))
        .json(request)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::UnknownError(response.text().await?));
    }

    Ok(response)
}

fn streaming_request(request: &ChatCompletionRequest) -> ChatCompletionRequest {
    let mut request = request.clone();
    request.stream = Some(true);
    request
}

fn ensure_not_streaming(request: &ChatCompletionRequest) -> Result<()> {
    if request.stream == Some(true) {
        return Err(Error::StreamingNotSupported(
            "Streaming is not supported when using chat_completions() api".to_string(),
        ));
    }
    Ok(())
}

/// Turns an event-stream response body into chat completion chunks.
///
/// The stream ends on `data: [DONE]`, at end of body, or when the request's
/// cancellation token fires. The first decoding or transport error is yielded
/// and ends the stream.
fn chunk_stream(
    response: reqwest::Response,
    cancellation_token: Option<CancellationToken>,
) -> ChatCompletionStream {
    Box::pin(sse_chunks(response, cancellation_token.unwrap_or_default()))
}

fn sse_chunks(
    response: reqwest::Response,
    cancellation_token: CancellationToken,
) -> impl Stream<Item = Result<ChatCompletionChunk>> + Send {
    async_stream::try_stream! {
        let mut body = Box::pin(response.bytes_stream());
        let mut parser = SseParser::default();
        let mut done = false;
        let mut chunks = 0usize;

        while !done {
            let next = tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    debug!(chunks, "chat completion stream cancelled");
                    break;
                }
                next = body.next() => next,
            };

            let events = match next {
                Some(bytes) => parser.feed(&bytes?),
                None => {
                    done = true;
                    parser.finish().into_iter().collect()
                }
            };

            for event in events {
                match event? {
                    SseEvent::Chunk(chunk) => {
                        chunks += 1;
                        yield chunk;
                    }
                    SseEvent::Done => {
                        done = true;
                        break;
                    }
                }
            }
        }

        debug!(chunks, "chat completion stream ended");
    }
}
