#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::test;

    use crate::config::{GenerationParams, RetryPolicy};
    use crate::errors::{TransportError, TransportErrorKind};
    use crate::implementations::retrying_gateway::RetryingGateway;
    use crate::models::common::MediaType;
    use crate::models::input::ModelRequest;
    use crate::tests::support::{init_logging, jpeg_bytes, Scripted, ScriptedTransport};
    use crate::traits::ModelGateway;

    fn request() -> ModelRequest {
        ModelRequest::new(
            Arc::from(jpeg_bytes()),
            MediaType::Jpeg,
            "Describe the image".to_string(),
            GenerationParams::default()
        ).unwrap()
    }

    fn gateway(script: Vec<Scripted>) -> (RetryingGateway<ScriptedTransport>, ScriptedTransport) {
        init_logging();
        let transport = ScriptedTransport::new(script);
        (RetryingGateway::new(transport.clone(), RetryPolicy::without_delay()), transport)
    }

    fn transient() -> Scripted {
        Scripted::Fail(TransportError::transient("connection reset"))
    }

    #[test]
    async fn transient_failures_are_retried_until_success() {
        let (gateway, transport) = gateway(vec![
            transient(),
            transient(),
            Scripted::Reply("all good".to_string()),
        ]);

        let reply = gateway.invoke(request()).await.unwrap();
        assert_eq!(reply.text, "all good");
        assert_eq!(transport.calls(), 3);
    }

    #[test]
    async fn rate_limited_is_retried() {
        let (gateway, transport) = gateway(vec![
            Scripted::Fail(TransportError::rate_limited("429 Too Many Requests")),
            Scripted::Reply("ok".to_string()),
        ]);

        assert!(gateway.invoke(request()).await.is_ok());
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    async fn exhausted_retries_become_unavailable() {
        let (gateway, transport) =
            gateway(vec![transient(), transient(), transient(), transient()]);

        let err = gateway.invoke(request()).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Unavailable);
        assert!(err.message.contains("4 attempts"));
        assert_eq!(transport.calls(), 4);
    }

    #[test]
    async fn malformed_is_returned_after_one_call() {
        let (gateway, transport) = gateway(vec![
            Scripted::Fail(TransportError::malformed("blocked by safety filter")),
            Scripted::Reply("never reached".to_string()),
        ]);

        let err = gateway.invoke(request()).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Malformed);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    async fn fatal_is_returned_after_one_call() {
        let (gateway, transport) =
            gateway(vec![Scripted::Fail(TransportError::fatal("401 Unauthorized"))]);

        let err = gateway.invoke(request()).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Fatal);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    async fn hung_attempt_times_out_as_transient() {
        init_logging();
        let transport = ScriptedTransport::new(vec![
            Scripted::Hang,
            Scripted::Reply("late but fine".to_string()),
        ]);
        let policy = RetryPolicy { call_timeout_secs: 1, ..RetryPolicy::without_delay() };
        let gateway = RetryingGateway::new(transport.clone(), policy);

        let reply = gateway.invoke(request()).await.unwrap();
        assert_eq!(reply.text, "late but fine");
        assert_eq!(transport.calls(), 2);
    }
}
