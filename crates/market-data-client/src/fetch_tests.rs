#[cfg(test)]
mod tests {
    use super::super::clock::{Clock, ManualClock};
    use super::super::fetch::*;
    use super::super::rate_limiter::CooldownLimiter;
    use super::super::retry::RetryPolicy;
    use analysis_core::{StockDataError, Symbol};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays a fixed list of outcomes and records when each call started.
    struct ScriptedTransport {
        clock: Arc<ManualClock>,
        outcomes: Mutex<VecDeque<Result<serde_json::Value, StockDataError>>>,
        call_times: Mutex<Vec<Duration>>,
    }

    impl ScriptedTransport {
        fn new(clock: Arc<ManualClock>, outcomes: Vec<Result<serde_json::Value, StockDataError>>) -> Self {
            Self {
                clock,
                outcomes: Mutex::new(outcomes.into()),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Duration> {
            self.call_times.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError> {
            self.call_times.lock().unwrap().push(self.clock.elapsed());
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StockDataError::Network("script exhausted".into())));
            next.map(|body| RawQuotePayload { kind: *request, body })
        }
    }

    struct SlowTransport;

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, _symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(RawQuotePayload { kind: *request, body: serde_json::Value::Null })
        }
    }

    struct InstantTransport;

    #[async_trait]
    impl Transport for InstantTransport {
        async fn send(&self, _symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError> {
            Ok(RawQuotePayload { kind: *request, body: serde_json::Value::Null })
        }
    }

    fn rate_limited() -> Result<serde_json::Value, StockDataError> {
        Err(StockDataError::RateLimit("HTTP 429".into()))
    }

    fn client_with(
        clock: &Arc<ManualClock>,
        transport: Arc<dyn Transport>,
        cooldown: Duration,
    ) -> FetchClient {
        let limiter = Arc::new(CooldownLimiter::with_clock(cooldown, clock.clone() as Arc<dyn Clock>));
        FetchClient::new(transport, limiter, RetryPolicy::default())
    }

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[tokio::test]
    async fn test_success_passes_payload_through() {
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(clock.clone(), vec![Ok(serde_json::json!({"ok": true}))]));
        let client = client_with(&clock, transport.clone(), Duration::from_secs(2));

        let payload = client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap();
        assert_eq!(payload.kind, RequestKind::CompanyProfile);
        assert_eq!(payload.body["ok"], true);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(
            clock.clone(),
            vec![rate_limited(), Ok(serde_json::json!({}))],
        ));
        let client = client_with(&clock, transport.clone(), Duration::from_secs(2));

        assert!(client.fetch(&aapl(), RequestKind::Financials).await.is_ok());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries_without_fourth_attempt() {
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(
            clock.clone(),
            vec![rate_limited(), rate_limited(), rate_limited(), Ok(serde_json::json!({}))],
        ));
        let client = client_with(&clock, transport.clone(), Duration::from_secs(2));

        let err = client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap_err();
        assert!(matches!(err, StockDataError::RateLimit(_)));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_spacing_holds_across_retries() {
        let clock = Arc::new(ManualClock::new());
        let cooldown = Duration::from_secs(2);
        let transport = Arc::new(ScriptedTransport::new(
            clock.clone(),
            vec![rate_limited(), rate_limited(), Ok(serde_json::json!({})), Ok(serde_json::json!({}))],
        ));
        let client = client_with(&clock, transport.clone(), cooldown);

        client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap();
        client.fetch(&aapl(), RequestKind::Financials).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= cooldown, "calls too close: {:?}", calls);
        }
    }

    #[tokio::test]
    async fn test_backoff_sleeps_follow_policy() {
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(
            clock.clone(),
            vec![rate_limited(), rate_limited(), rate_limited()],
        ));
        // No cooldown so only backoff sleeps are recorded
        let client = client_with(&clock, transport, Duration::ZERO);

        let _ = client.fetch(&aapl(), RequestKind::CompanyProfile).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_invalid_symbol_not_retried() {
        let clock = Arc::new(ManualClock::new());
        let transport = Arc::new(ScriptedTransport::new(
            clock.clone(),
            vec![Err(StockDataError::InvalidSymbol("INVALIDXYZ".into())), Ok(serde_json::json!({}))],
        ));
        let client = client_with(&clock, transport.clone(), Duration::from_secs(2));

        let err = client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap_err();
        assert!(matches!(err, StockDataError::InvalidSymbol(_)));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_request_timeout_maps_to_timeout() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(CooldownLimiter::with_clock(Duration::ZERO, clock.clone() as Arc<dyn Clock>));
        let client = FetchClient::new(
            Arc::new(SlowTransport),
            limiter,
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
        )
        .with_request_timeout(Some(Duration::from_millis(20)));

        let err = client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap_err();
        assert!(matches!(err, StockDataError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_deadline_bounds_whole_call() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(CooldownLimiter::with_clock(Duration::ZERO, clock.clone() as Arc<dyn Clock>));
        let client = FetchClient::new(Arc::new(SlowTransport), limiter, RetryPolicy::default())
            .with_request_timeout(None);

        let err = client
            .fetch_with_deadline(&aapl(), RequestKind::CompanyProfile, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, StockDataError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_queue_wait_does_not_count_against_request_timeout() {
        // Six callers behind a 100ms cooldown: the last one queues ~500ms,
        // well past the 250ms per-request bound, yet each request is instant.
        let limiter = Arc::new(CooldownLimiter::new(Duration::from_millis(100)));
        let client = FetchClient::new(
            Arc::new(InstantTransport),
            limiter,
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
        )
        .with_request_timeout(Some(Duration::from_millis(250)));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.fetch(&aapl(), RequestKind::CompanyProfile).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "queued call failed: {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_deadline_includes_queue_wait() {
        let limiter = Arc::new(CooldownLimiter::new(Duration::from_secs(5)));
        let client = FetchClient::new(Arc::new(InstantTransport), limiter, RetryPolicy::default());

        client.fetch(&aapl(), RequestKind::CompanyProfile).await.unwrap();
        let err = client
            .fetch_with_deadline(&aapl(), RequestKind::Financials, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, StockDataError::Timeout(_)));
    }
}
