//! W3C `traceparent` codec.
//!
//! Header format: `00-{32 hex trace id}-{16 hex span id}-{2 hex flags}`.
//! Only version `00` is read or written.

use crate::error::ParseError;
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

const SUPPORTED_VERSION: &str = "00";
const DEFAULT_FLAGS: &str = "01";
const TRACE_ID_LEN: usize = 32;
const SPAN_ID_LEN: usize = 16;
const FLAGS_LEN: usize = 2;

thread_local! {
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_entropy());
}

fn new_trace_id() -> String {
    let id = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        loop {
            let id = rng.gen::<u128>();
            if id != 0 {
                break id;
            }
        }
    });
    format!("{:032x}", id)
}

fn new_span_id() -> String {
    let id = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        loop {
            let id = rng.gen::<u64>();
            if id != 0 {
                break id;
            }
        }
    });
    format!("{:016x}", id)
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Trace correlation identifiers carried by every log record.
///
/// Values are immutable; [`TraceContext::derive_child`] returns a new
/// context instead of touching the parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    trace_flags: String,
    trace_state: Option<String>,
}

impl TraceContext {
    /// Fresh random trace and span ids with the sampled flag set.
    pub fn generate() -> Self {
        TraceContext {
            trace_id: new_trace_id(),
            span_id: new_span_id(),
            trace_flags: DEFAULT_FLAGS.to_string(),
            trace_state: None,
        }
    }

    /// Same trace, flags and state; new span id.
    pub fn derive_child(&self) -> Self {
        TraceContext {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
            trace_flags: self.trace_flags.clone(),
            trace_state: self.trace_state.clone(),
        }
    }

    pub fn with_trace_state(&self, state: impl Into<String>) -> Self {
        TraceContext {
            trace_state: Some(state.into()),
            ..self.clone()
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn trace_flags(&self) -> &str {
        &self.trace_flags
    }

    pub fn trace_state(&self) -> Option<&str> {
        self.trace_state.as_deref()
    }

    /// Render the `traceparent` header value.
    pub fn to_header(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, self.trace_flags
        )
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header())
    }
}

impl FromStr for TraceContext {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a `traceparent` header value.
///
/// Checks run in field order, so the first malformed field decides the
/// error kind. `trace_state` is never set by this function.
pub fn parse(header_value: &str) -> Result<TraceContext, ParseError> {
    let parts: Vec<&str> = header_value.split('-').collect();
    if parts.len() != 4 {
        return Err(ParseError::InvalidFormat);
    }
    if parts[0] != SUPPORTED_VERSION {
        return Err(ParseError::UnsupportedVersion);
    }
    if !is_hex(parts[1], TRACE_ID_LEN) {
        return Err(ParseError::InvalidTraceId);
    }
    if !is_hex(parts[2], SPAN_ID_LEN) {
        return Err(ParseError::InvalidSpanId);
    }
    if !is_hex(parts[3], FLAGS_LEN) {
        return Err(ParseError::InvalidFlags);
    }

    Ok(TraceContext {
        trace_id: parts[1].to_ascii_lowercase(),
        span_id: parts[2].to_ascii_lowercase(),
        trace_flags: parts[3].to_ascii_lowercase(),
        trace_state: None,
    })
}

/// Read access to inbound request headers.
///
/// Header names are expected to be lower-case already; normalizing them is
/// the HTTP layer's job.
pub trait HeaderSource {
    /// First value recorded for `name`, if any.
    fn first(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for HashMap<String, String> {
    fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl HeaderSource for HashMap<String, Vec<String>> {
    fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(String::as_str)
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl HeaderSource for BTreeMap<String, Vec<String>> {
    fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(String::as_str)
    }
}

/// Write access to outbound request headers.
pub trait HeaderSink {
    fn set(&mut self, name: &str, value: String);
}

impl HeaderSink for HashMap<String, String> {
    fn set(&mut self, name: &str, value: String) {
        self.insert(name.to_string(), value);
    }
}

impl HeaderSink for BTreeMap<String, String> {
    fn set(&mut self, name: &str, value: String) {
        self.insert(name.to_string(), value);
    }
}

/// Pull the trace context out of inbound headers.
///
/// A missing header (or an empty value list) starts a new trace. A header
/// that is present but malformed is reported, not replaced.
pub fn extract<H: HeaderSource + ?Sized>(headers: &H) -> Result<TraceContext, ParseError> {
    match headers.first(TRACEPARENT_HEADER) {
        Some(value) => parse(value),
        None => Ok(TraceContext::generate()),
    }
}

/// Write `traceparent` (and `tracestate`, when present) for an outbound call.
pub fn inject<H: HeaderSink + ?Sized>(ctx: &TraceContext, headers: &mut H) {
    headers.set(TRACEPARENT_HEADER, ctx.to_header());
    if let Some(state) = ctx.trace_state() {
        headers.set(TRACESTATE_HEADER, state.to_string());
    }
}
