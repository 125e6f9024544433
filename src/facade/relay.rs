//! Driving a vendor byte stream through an encoder

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use tracing::debug;

use crate::activity::{ActivitySink, RequestContext};
use crate::error::AppResult;
use crate::streaming::LineBuffer;
use crate::transform::{Aggregate, StreamEncoder, VendorEvent};
use crate::vendor::{ByteStream, SessionManager};

/// Client-facing frames, already encoded
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// Per-request side effects of reading the vendor stream
pub(crate) struct Relay {
    pub ctx: RequestContext,
    pub activity: Arc<dyn ActivitySink>,
    /// Long-lived session to thread `response.created` into
    pub threading: Option<(Arc<SessionManager>, String)>,
}

impl Relay {
    async fn observe(&self, event: &VendorEvent) {
        match event {
            VendorEvent::ResponseCreated {
                parent_id: Some(parent_id),
                response_id: Some(response_id),
            } => {
                if let Some((sessions, chat_id)) = &self.threading {
                    sessions
                        .record_response_created(chat_id, parent_id, response_id)
                        .await;
                }
            }
            VendorEvent::Failure(message) => {
                self.ctx.log_warning(message);
                self.activity.report(
                    "Vendor stream error",
                    &json!({ "trace_id": self.ctx.trace_id, "error": message }),
                );
            }
            VendorEvent::Unrecognized(raw) => {
                debug!(trace_id = %self.ctx.trace_id, line = %raw, "Unrecognized vendor line");
                self.activity.report(
                    "Unrecognized vendor line passed through",
                    &json!({ "trace_id": self.ctx.trace_id, "line": raw }),
                );
            }
            _ => {}
        }
    }

    /// Re-encode `upstream` frame by frame.
    ///
    /// Reading stops as soon as the encoder reports completion, which drops
    /// the upstream connection.
    pub fn stream(self, mut upstream: ByteStream, mut encoder: Box<dyn StreamEncoder>) -> FrameStream {
        let stream = async_stream::stream! {
            let mut buffer = LineBuffer::new();
            let mut lines = 0usize;
            let mut closed = false;
            self.ctx.log_stream_started();

            'relay: loop {
                let batch: Vec<String> = match upstream.next().await {
                    Some(Ok(bytes)) => buffer.feed(&bytes),
                    Some(Err(e)) => {
                        let event = VendorEvent::Failure(e.to_string());
                        self.observe(&event).await;
                        for frame in encoder.encode(&event) {
                            yield Ok::<Bytes, Infallible>(frame);
                        }
                        break 'relay;
                    }
                    None => {
                        closed = true;
                        buffer.finish().into_iter().collect()
                    }
                };

                for line in batch {
                    lines += 1;
                    if let Some(event) = VendorEvent::decode(&line) {
                        self.observe(&event).await;
                        for frame in encoder.encode(&event) {
                            yield Ok(frame);
                        }
                    }
                    if encoder.is_done() {
                        break 'relay;
                    }
                }
                if closed {
                    break 'relay;
                }
            }

            for frame in encoder.finish() {
                yield Ok(frame);
            }
            self.ctx.log_stream_ended(lines);
        };
        Box::pin(stream)
    }

    /// Fold the whole of `upstream` into an [`Aggregate`].
    ///
    /// A transport error before any output is returned as the error; after
    /// output it is kept as the aggregate's failure.
    pub async fn collect(&self, mut upstream: ByteStream) -> AppResult<Aggregate> {
        let mut buffer = LineBuffer::new();
        let mut aggregate = Aggregate::new();

        loop {
            let lines = match upstream.next().await {
                Some(Ok(bytes)) => buffer.feed(&bytes),
                Some(Err(e)) => {
                    if aggregate.content.is_empty() && aggregate.thinking.is_empty() {
                        return Err(e);
                    }
                    let event = VendorEvent::Failure(e.to_string());
                    self.observe(&event).await;
                    aggregate.apply(&event);
                    break;
                }
                None => {
                    let tail = buffer.finish();
                    for event in tail.iter().filter_map(|line| VendorEvent::decode(line)) {
                        self.observe(&event).await;
                        aggregate.apply(&event);
                    }
                    break;
                }
            };

            for event in lines.iter().filter_map(|line| VendorEvent::decode(line)) {
                self.observe(&event).await;
                aggregate.apply(&event);
            }
        }

        Ok(aggregate)
    }
}
