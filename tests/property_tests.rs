//! Property-based tests using proptest

use proptest::prelude::*;
use serde_json::Value;
use tracing_log_export::level::should_log;
use tracing_log_export::record::{format_record, Fields, MASKED_VALUE};
use tracing_log_export::trace_context::{self, TraceContext};
use tracing_log_export::{LogLevel, LoggerConfig};

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
    ]
}

proptest! {
    /// A call passes the filter exactly when its rank is at least the
    /// configured rank
    #[test]
    fn test_should_log_matches_rank(configured in any_level(), message in any_level()) {
        prop_assert_eq!(should_log(configured, message), message.rank() >= configured.rank());
        prop_assert!(should_log(configured, configured));
    }

    /// Level names parse back to the same level
    #[test]
    fn test_level_name_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.as_str().parse().unwrap();
        prop_assert_eq!(parsed, level);
    }

    /// Any well-formed header survives parse then format
    #[test]
    fn test_header_roundtrip(
        trace_id in "[0-9a-f]{32}",
        span_id in "[0-9a-f]{16}",
        flags in "[0-9a-f]{2}",
    ) {
        let header = format!("00-{}-{}-{}", trace_id, span_id, flags);
        let ctx = trace_context::parse(&header).unwrap();
        prop_assert_eq!(ctx.trace_id(), trace_id.as_str());
        prop_assert_eq!(ctx.span_id(), span_id.as_str());
        prop_assert_eq!(ctx.trace_flags(), flags.as_str());
        prop_assert_eq!(ctx.to_header(), header);
    }

    /// Wrong-length trace ids are always rejected
    #[test]
    fn test_short_trace_id_rejected(trace_id in "[0-9a-f]{1,31}") {
        let header = format!("00-{}-00f067aa0ba902b7-01", trace_id);
        prop_assert_eq!(
            trace_context::parse(&header),
            Err(tracing_log_export::ParseError::InvalidTraceId)
        );
    }

    /// Sensitive values never reach the serialized record
    #[test]
    fn test_sensitive_values_never_leak(
        prefix in "[a-z]{0,6}",
        fragment in prop_oneof![
            Just("password"), Just("Token"), Just("SECRET"),
            Just("apiKey"), Just("apikey"), Just("api_key"),
        ],
        secret in "[A-Z]{12}",
    ) {
        let key = format!("{}{}", prefix, fragment);
        let value = format!("leak-{}", secret);

        let mut fields = Fields::new();
        fields.insert(key.clone(), Value::String(value.clone()));
        let mut nested = Fields::new();
        nested.insert(key.clone(), Value::String(value.clone()));
        fields.insert("nested".to_string(), Value::Object(nested));

        let json = format_record(
            &LoggerConfig::new("svc"),
            LogLevel::Info,
            "msg",
            &TraceContext::generate(),
            &fields,
            None,
        ).unwrap();

        prop_assert!(!json.contains(&value));
        let parsed: Value = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&parsed[&key], MASKED_VALUE);
        prop_assert_eq!(&parsed["nested"][&key], MASKED_VALUE);
    }
}

#[test]
fn test_generated_contexts_roundtrip() {
    for _ in 0..1000 {
        let ctx = TraceContext::generate();
        let parsed = trace_context::parse(&ctx.to_header()).unwrap();
        assert_eq!(parsed, ctx);

        let child = ctx.derive_child();
        assert_eq!(child.trace_id(), ctx.trace_id());
        assert_eq!(child.trace_flags(), ctx.trace_flags());
        assert_ne!(child.span_id(), ctx.span_id());
    }
}
