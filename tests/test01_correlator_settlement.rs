use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use sql_relay::SqlRelayError;
use sql_relay::config::RelayOptions;
use sql_relay::correlator::{ReceiveOutcome, RpcCorrelator};
use sql_relay::protocol::{Method, RequestEnvelope, RequestId, ResponseEnvelope, WireError};

fn correlator_with_outbound(
    options: RelayOptions,
) -> (RpcCorrelator, mpsc::UnboundedReceiver<RequestEnvelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RpcCorrelator::new(tx, &options), rx)
}

#[tokio::test]
async fn response_settles_the_matching_request() -> Result<(), SqlRelayError> {
    let (correlator, mut outbound) = correlator_with_outbound(RelayOptions::default());

    let send = tokio::spawn({
        let correlator = correlator.clone();
        async move { correlator.send(Method::Execute, vec![json!("SELECT 1")]).await }
    });

    let envelope = outbound.recv().await.expect("request transmitted");
    assert_eq!(envelope.method, "execute");
    let outcome =
        correlator.on_message(ResponseEnvelope::success(envelope.id, json!([{"x": 1}])));
    assert_eq!(outcome, ReceiveOutcome::Settled);

    let result = send.await.expect("join")?;
    assert_eq!(result, json!([{"x": 1}]));
    assert_eq!(correlator.outstanding(), 0);
    Ok(())
}

#[tokio::test]
async fn error_response_rejects_with_remote_kind() {
    let (correlator, mut outbound) = correlator_with_outbound(RelayOptions::default());

    let send = tokio::spawn({
        let correlator = correlator.clone();
        async move { correlator.send(Method::Execute, vec![json!("bogus")]).await }
    });

    let envelope = outbound.recv().await.expect("request transmitted");
    correlator.on_message(ResponseEnvelope::failure(
        Some(envelope.id),
        WireError::new(1, "near \"bogus\": syntax error"),
    ));

    match send.await.expect("join") {
        Err(SqlRelayError::Remote { code, .. }) => assert_eq!(code, 1),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn second_response_for_a_settled_id_is_unmatched() {
    let (correlator, mut outbound) = correlator_with_outbound(RelayOptions::default());

    let send = tokio::spawn({
        let correlator = correlator.clone();
        async move { correlator.send(Method::Execute, vec![json!("SELECT 1")]).await }
    });

    let envelope = outbound.recv().await.expect("request transmitted");
    let first = correlator.on_message(ResponseEnvelope::success(envelope.id.clone(), json!(1)));
    let second = correlator.on_message(ResponseEnvelope::success(envelope.id, json!(2)));

    assert_eq!(first, ReceiveOutcome::Settled);
    assert_eq!(second, ReceiveOutcome::Unmatched);
    assert_eq!(send.await.expect("join").expect("settled once"), json!(1));
}

#[tokio::test]
async fn timeout_rejects_then_late_response_is_swallowed() {
    let options = RelayOptions::builder()
        .request_timeout(Duration::from_millis(20))
        .grace_window(Duration::from_secs(5))
        .finish();
    let (correlator, mut outbound) = correlator_with_outbound(options);

    let send = tokio::spawn({
        let correlator = correlator.clone();
        async move { correlator.send(Method::Execute, vec![json!("SELECT 1")]).await }
    });

    let envelope = outbound.recv().await.expect("request transmitted");
    assert!(matches!(
        send.await.expect("join"),
        Err(SqlRelayError::RequestTimeout)
    ));
    assert_eq!(correlator.outstanding(), 0);

    // The late response arrives after the timeout already rejected the
    // request; it is swallowed, not misreported as unmatched.
    let outcome = correlator.on_message(ResponseEnvelope::success(envelope.id, json!(1)));
    assert_eq!(outcome, ReceiveOutcome::LateAfterTimeout);
}

#[tokio::test]
async fn grace_window_expiry_forgets_timed_out_ids() {
    let options = RelayOptions::builder()
        .request_timeout(Duration::from_millis(10))
        .grace_window(Duration::from_millis(20))
        .finish();
    let (correlator, mut outbound) = correlator_with_outbound(options);

    let send = tokio::spawn({
        let correlator = correlator.clone();
        async move { correlator.send(Method::Execute, vec![json!("SELECT 1")]).await }
    });
    let envelope = outbound.recv().await.expect("request transmitted");
    assert!(matches!(
        send.await.expect("join"),
        Err(SqlRelayError::RequestTimeout)
    ));

    tokio::time::sleep(Duration::from_millis(40)).await;
    let outcome = correlator.on_message(ResponseEnvelope::success(envelope.id, json!(1)));
    assert_eq!(outcome, ReceiveOutcome::Unmatched);
}

#[tokio::test]
async fn notifications_and_unknown_ids_never_raise() {
    let (correlator, _outbound) = correlator_with_outbound(RelayOptions::default());

    let notification = correlator.on_message(ResponseEnvelope::failure(
        None,
        WireError::internal("worker log line"),
    ));
    assert_eq!(notification, ReceiveOutcome::Notification);

    let unknown = correlator.on_message(ResponseEnvelope::success(
        RequestId::new("never-sent"),
        json!(1),
    ));
    assert_eq!(unknown, ReceiveOutcome::Unmatched);
}
