//! Log record model

use super::LogLevel;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// How the text content of a record should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Json,
}

/// A structured payload waiting to be converted to text
#[derive(Debug, Clone)]
pub struct LogObject {
    value: Option<Value>,
    text: String,
}

impl LogObject {
    /// Capture `object` as structured data plus its plain `Debug` text
    pub fn new<T: Serialize + fmt::Debug + ?Sized>(object: &T) -> Self {
        Self {
            value: serde_json::to_value(object).ok(),
            text: format!("{:?}", object),
        }
    }

    /// Structured value, `None` when the object could not be serialized
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Plain text form
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Content of a record: text, or an object not yet converted
#[derive(Debug, Clone)]
pub enum LogContent {
    Text(String),
    Object(LogObject),
}

impl LogContent {
    pub fn object<T: Serialize + fmt::Debug + ?Sized>(object: &T) -> Self {
        LogContent::Object(LogObject::new(object))
    }

    /// Text seen by formats; objects render as their plain form
    pub fn as_text(&self) -> &str {
        match self {
            LogContent::Text(text) => text,
            LogContent::Object(object) => object.text(),
        }
    }
}

impl From<String> for LogContent {
    fn from(value: String) -> Self {
        LogContent::Text(value)
    }
}

impl From<&str> for LogContent {
    fn from(value: &str) -> Self {
        LogContent::Text(value.to_string())
    }
}

impl From<LogObject> for LogContent {
    fn from(value: LogObject) -> Self {
        LogContent::Object(value)
    }
}

/// One log record flowing through a log pipeline
///
/// Records are values: the transform step produces a new record through
/// [`LogInfo::with_json_content`] or [`LogInfo::into_text_content`] rather than
/// mutating the one it received. Print lengths are recomputed on every such
/// step.
#[derive(Clone)]
pub struct LogInfo {
    thread_name: String,
    location: Option<&'static Location<'static>>,
    level: LogLevel,
    tag: String,
    time: i64,
    content: LogContent,
    content_type: ContentType,
    error: Option<Arc<anyhow::Error>>,
    trace_length: usize,
    print_length: usize,
    print_bytes_length: usize,
}

impl LogInfo {
    /// Create a record stamped with the current thread and time
    #[track_caller]
    pub fn new(level: LogLevel, tag: impl Into<String>, content: impl Into<LogContent>) -> Self {
        let thread = std::thread::current();
        let mut info = Self {
            thread_name: thread.name().unwrap_or("unnamed").to_string(),
            location: Some(Location::caller()),
            level,
            tag: tag.into(),
            time: chrono::Utc::now().timestamp_millis(),
            content: content.into(),
            content_type: ContentType::Text,
            error: None,
            trace_length: 0,
            print_length: 0,
            print_bytes_length: 0,
        };
        info.measure();
        info
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self.measure();
        self
    }

    pub fn with_location(mut self, location: Option<&'static Location<'static>>) -> Self {
        self.location = location;
        self.measure();
        self
    }

    /// Override the creation time (milliseconds since the Unix epoch)
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    pub fn with_error(mut self, error: impl Into<anyhow::Error>) -> Self {
        self.error = Some(Arc::new(error.into()));
        self
    }

    /// Replace the content with converted JSON text
    pub fn with_json_content(mut self, json: String) -> Self {
        self.content = LogContent::Text(json);
        self.content_type = ContentType::Json;
        self.measure();
        self
    }

    /// Replace an object payload with its plain text form
    pub fn into_text_content(mut self) -> Self {
        if let LogContent::Object(object) = &self.content {
            self.content = LogContent::Text(object.text().to_string());
        }
        self.content_type = ContentType::Text;
        self.measure();
        self
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Creation time in milliseconds since the Unix epoch
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn content(&self) -> &LogContent {
        &self.content
    }

    /// Content as text
    pub fn text(&self) -> &str {
        self.content.as_text()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_deref()
    }

    /// Call site as `file:line:column`, empty when unknown
    pub fn trace(&self) -> String {
        self.location
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default()
    }

    pub fn trace_length(&self) -> usize {
        self.trace_length
    }

    /// Longest of the trace and the content, in characters
    pub fn print_length(&self) -> usize {
        self.print_length
    }

    /// Byte length of whichever of the trace and the content is longer
    pub fn print_bytes_length(&self) -> usize {
        self.print_bytes_length
    }

    fn measure(&mut self) {
        let trace = self.trace();
        let content = self.content.as_text();
        self.trace_length = trace.chars().count();
        let content_length = content.chars().count();
        self.print_length = self.trace_length.max(content_length);
        self.print_bytes_length = if self.trace_length >= content_length {
            trace.len()
        } else {
            content.len()
        };
    }
}

impl fmt::Debug for LogInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogInfo")
            .field("level", &self.level)
            .field("tag", &self.tag)
            .field("time", &self.time)
            .field("thread_name", &self.thread_name)
            .field("trace", &self.trace())
            .field("content", &self.content.as_text())
            .field("content_type", &self.content_type)
            .field("error", &self.error.as_ref().map(|e| format!("{:#}", e)))
            .finish()
    }
}
