//! 可观测性模块集成测试
//!
//! 指标记录在未安装 recorder 时为空操作；追踪上下文按 W3C Trace Context 传播。

mod metrics_tests {
    use loyalty_shared::observability::metrics::{
        record_accrual_request, record_http_request, record_order_upload,
        record_reconciliation_batch, record_reconciliation_order, record_withdrawal,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/api/user/orders", 202, 0.01);
        record_http_request("GET", "/api/user/balance", 200, 0.005);
        record_http_request("POST", "/api/user/balance/withdraw", 402, 0.02);
        record_http_request("GET", "/api/user/withdrawals", 204, 0.003);
    }

    #[test]
    fn test_record_reconciliation() {
        record_reconciliation_batch(0);
        record_reconciliation_batch(100);
        record_accrual_request("known", 0.05);
        record_accrual_request("throttled", 0.01);
        record_accrual_request("error", 5.0);
        record_reconciliation_order("updated");
        record_reconciliation_order("unchanged");
    }

    #[test]
    fn test_record_ledger_operations() {
        record_order_upload("accepted");
        record_order_upload("conflict");
        record_withdrawal("ok");
        record_withdrawal("insufficient_funds");
    }
}

mod tracing_tests {
    use axum::http::{HeaderMap, HeaderValue};
    use loyalty_shared::observability::tracing::{
        current_trace_id, extract_from_headers, inject_to_headers, set_parent_from_headers,
    };
    use opentelemetry::trace::TraceContextExt;

    #[test]
    fn test_extract_from_valid_traceparent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"),
        );

        let context = extract_from_headers(&headers);
        let span_context = context.span().span_context().clone();

        assert!(span_context.is_valid());
        assert_eq!(
            span_context.trace_id().to_string(),
            "0af7651916cd43dd8448eb211c80319c"
        );
        assert_eq!(span_context.span_id().to_string(), "b7ad6b7169203331");
    }

    #[test]
    fn test_extract_from_malformed_traceparent() {
        for invalid in [
            "",
            "invalid-format",
            "00-0af7651916cd43dd8448eb211c80319c",
            "00-invalid-b7ad6b7169203331-01",
        ] {
            let mut headers = HeaderMap::new();
            headers.insert("traceparent", HeaderValue::from_static(invalid));
            let context = extract_from_headers(&headers);
            assert!(!context.span().span_context().is_valid(), "{}", invalid);
        }
    }

    #[test]
    fn test_inject_without_active_span_adds_nothing() {
        let mut headers = HeaderMap::new();
        inject_to_headers(&mut headers);
        assert!(!headers.contains_key("traceparent"));
    }

    #[test]
    fn test_set_parent_and_trace_id_without_subscriber() {
        let span = tracing::info_span!("reconcile");
        set_parent_from_headers(&span, &HeaderMap::new());

        let _entered = span.enter();
        assert!(current_trace_id().is_none());
    }
}

mod request_id_tests {
    use loyalty_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id_as_str() {
        let id = RequestId("req-1".to_string());
        assert_eq!(id.as_str(), "req-1");
        assert_eq!(id.clone().0, "req-1");
    }
}
