use linebot_core::InboundEvent;
use tracing::Span;

const EVENTS_COUNTER: &str = "webhook_events_total";
const INGRESS_SPAN_NAME: &str = "ingress.handle";

/// Span wrapping the dispatch of one inbound event.
///
/// ```
/// use linebot_core::WebhookPayload;
/// use linebot_ingress_common::start_ingress_span;
///
/// let payload = WebhookPayload::from_slice(
///     br#"{"events":[{"type":"follow","source":{"type":"user","userId":"U1"}}]}"#,
/// ).unwrap();
/// let span = start_ingress_span(&payload.events[0], Some("req-1"));
/// let _guard = span.enter();
/// ```
pub fn start_ingress_span(event: &InboundEvent, request_id: Option<&str>) -> Span {
    tracing::info_span!(
        INGRESS_SPAN_NAME,
        request_id = %request_id.unwrap_or("n/a"),
        kind = %event.kind.as_str(),
        webhook_event_id = %event.webhook_event_id.as_deref().unwrap_or_default(),
        sender = %event.sender_id().unwrap_or_default(),
    )
}

/// Counts an inbound event by kind and how it was handled.
pub fn record_event(event: &InboundEvent, outcome: &'static str) {
    metrics::counter!(
        EVENTS_COUNTER,
        "kind" => event.kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
