use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    EnvelopeParse(String),
    MalformedEnvelope(String),
    TargetNotFound(String),
    ScriptParse(String),
    ScriptRuntime(String),
    Transport(String),
    TypeMismatch {
        id: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        id: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::EnvelopeParse(msg) => write!(f, "envelope parse error: {msg}"),
            Self::MalformedEnvelope(msg) => write!(f, "malformed envelope: {msg}"),
            Self::TargetNotFound(id) => write!(f, "target not found: {id}"),
            Self::ScriptParse(msg) => write!(f, "script parse error: {msg}"),
            Self::ScriptRuntime(msg) => write!(f, "script runtime error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::TypeMismatch {
                id,
                expected,
                actual,
            } => write!(f, "type mismatch for {id}: expected {expected}, actual {actual}"),
            Self::AssertionFailed {
                id,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {id}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

mod dom;
mod envelope;
mod form;
mod html;
mod js_regex;
mod processor;
mod scheduler;
mod script;
mod transport;

pub use envelope::{Envelope, Instruction, ENVELOPE_ROOT};
pub use processor::ProcessOutcome;
pub use transport::Delivery;

use dom::*;
use form::*;
use html::*;
use scheduler::*;
use script::*;
use transport::{MockResponse, PendingRequest};

#[derive(Debug)]
pub struct Page {
    dom: Dom,
    globals: HashMap<String, Value>,
    task_queue: Vec<ScheduledTask>,
    throttle_entries: HashMap<String, i64>,
    now_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    rng_state: u64,
    responses: HashMap<String, MockResponse>,
    pending: Vec<PendingRequest>,
    ajax_calls: Vec<String>,
    ajax_bodies: Vec<Option<String>>,
    alert_messages: Vec<String>,
    pre_call_handler: Option<String>,
    post_call_handler: Option<String>,
    error_handler: Option<String>,
    trace: bool,
    trace_ajax: bool,
    trace_timers: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        stacker::grow(32 * 1024 * 1024, || Self::from_html_impl(html))
    }

    fn from_html_impl(html: &str) -> Result<Self> {
        let ParseOutput { dom, scripts } = parse_fragment(html)?;
        let mut page = Self {
            dom,
            globals: HashMap::new(),
            task_queue: Vec::new(),
            throttle_entries: HashMap::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            rng_state: 0x9E37_79B9_7F4A_7C15,
            responses: HashMap::new(),
            pending: Vec::new(),
            ajax_calls: Vec::new(),
            ajax_bodies: Vec::new(),
            alert_messages: Vec::new(),
            pre_call_handler: None,
            post_call_handler: None,
            error_handler: None,
            trace: false,
            trace_ajax: true,
            trace_timers: true,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        };

        for script in scripts {
            page.exec_script_source(&script)?;
        }

        Ok(page)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_ajax(&mut self, enabled: bool) {
        self.trace_ajax = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::ScriptRuntime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng_state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::ScriptRuntime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn set_pre_call_handler(&mut self, script: Option<&str>) {
        self.pre_call_handler = script.map(str::to_string);
    }

    pub fn set_post_call_handler(&mut self, script: Option<&str>) {
        self.post_call_handler = script.map(str::to_string);
    }

    pub fn set_error_handler(&mut self, script: Option<&str>) {
        self.error_handler = script.map(str::to_string);
    }

    fn element_by_id(&self, id: &str) -> Result<NodeId> {
        self.dom
            .by_id(id)
            .ok_or_else(|| Error::TargetNotFound(id.to_string()))
    }

    pub fn text(&self, id: &str) -> Result<String> {
        let node = self.element_by_id(id)?;
        Ok(self.dom.text_content(node))
    }

    pub fn inner_html(&self, id: &str) -> Result<String> {
        let node = self.element_by_id(id)?;
        self.dom.inner_html(node)
    }

    pub fn value(&self, id: &str) -> Result<String> {
        let node = self.element_by_id(id)?;
        self.dom.value(node)
    }

    pub fn is_checked(&self, id: &str) -> Result<bool> {
        let node = self.element_by_id(id)?;
        Ok(self.dom.element(node).map(|e| e.checked).unwrap_or(false))
    }

    pub fn set_value(&mut self, id: &str, value: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        let tag = self.dom.tag_name(node).unwrap_or("").to_ascii_lowercase();
        if tag != "input" && tag != "textarea" && tag != "select" {
            return Err(Error::TypeMismatch {
                id: id.to_string(),
                expected: "input, textarea or select".into(),
                actual: tag,
            });
        }
        self.dom.set_value(node, value)
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<()> {
        let node = self.element_by_id(id)?;
        self.dom.set_checked(node, checked)
    }

    pub fn show(&mut self, id: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        self.dom.set_style(node, "display", "")
    }

    pub fn hide(&mut self, id: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        self.dom.set_style(node, "display", "none")
    }

    pub fn global_string(&self, name: &str) -> Option<String> {
        self.globals.get(name).map(Value::as_string)
    }

    pub fn global_number(&self, name: &str) -> Option<f64> {
        self.globals.get(name).and_then(Value::as_number)
    }

    pub fn global_bool(&self, name: &str) -> Option<bool> {
        self.globals.get(name).map(Value::truthy)
    }

    pub fn alerts(&self) -> &[String] {
        &self.alert_messages
    }

    pub fn eval(&mut self, script: &str) -> Result<()> {
        self.exec_script_source(script)
    }

    pub fn assert_text(&mut self, id: &str, expected: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        let actual = self.dom.text_content(node);
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            id: id.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: self.dom.snippet(node),
        })
    }

    pub fn assert_inner_html(&mut self, id: &str, expected: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        let actual = self.dom.inner_html(node)?;
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            id: id.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: self.dom.snippet(node),
        })
    }

    pub fn assert_value(&mut self, id: &str, expected: &str) -> Result<()> {
        let node = self.element_by_id(id)?;
        let actual = self.dom.value(node)?;
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            id: id.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: self.dom.snippet(node),
        })
    }

    pub fn assert_checked(&mut self, id: &str, expected: bool) -> Result<()> {
        let node = self.element_by_id(id)?;
        let actual = self.dom.element(node).map(|e| e.checked).unwrap_or(false);
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            dom_snippet: self.dom.snippet(node),
        })
    }

    pub fn assert_exists(&mut self, id: &str) -> Result<()> {
        self.element_by_id(id).map(|_| ())
    }

    pub fn assert_global(&mut self, name: &str, expected: &str) -> Result<()> {
        let actual = self
            .globals
            .get(name)
            .map(Value::as_string)
            .unwrap_or_else(|| "undefined".to_string());
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            id: name.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: String::new(),
        })
    }

    pub(crate) fn next_random_f64(&mut self) -> f64 {
        // xorshift64*: simple deterministic PRNG for the mock transport.
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = if x == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { x };
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        // Top 53 bits map onto [0.0, 1.0).
        ((bits >> 11) as f64) / ((1u64 << 53) as f64)
    }

    pub(crate) fn trace_ajax_line(&mut self, line: String) {
        if self.trace && self.trace_ajax {
            self.push_trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace && self.trace_timers {
            self.push_trace_line(line);
        }
    }

    fn push_trace_line(&mut self, line: String) {
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        self.trace_logs.push(line);
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
    }
}
