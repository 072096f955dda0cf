//! Record formatting
//!
//! Console writes are bounded in length, so every format cuts long content into
//! chunks with [`chunk_content`] and emits one line per chunk.

use super::{LogInfo, LogLevel};
use chrono::{Local, TimeZone};
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Default maximum byte length of one printed chunk
pub const DEFAULT_MAX_SINGLE_LOG_LENGTH: usize = 1000;

/// Default maximum number of chunks printed for one record
pub const DEFAULT_MAX_PRINT_TIMES: usize = usize::MAX;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const MIN_TABLE_WIDTH: usize = 40;

/// Turns a record into output lines
pub trait LogFormat: Send + Sync {
    /// Output lines for `info`, without line terminators
    fn format_lines(&self, info: &LogInfo) -> Vec<String>;

    /// Output lines joined with `\n`
    fn format(&self, info: &LogInfo) -> String {
        self.format_lines(info).join("\n")
    }
}

/// Header fields shown by a format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    #[serde(default = "default_true")]
    pub thread: bool,
    #[serde(default = "default_true")]
    pub tag: bool,
    #[serde(default = "default_true")]
    pub level: bool,
    #[serde(default = "default_true")]
    pub time: bool,
}

impl Default for LogHeader {
    fn default() -> Self {
        Self {
            thread: true,
            tag: true,
            level: true,
            time: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Split `content` into printable chunks
///
/// Content is split on line breaks first, then every line is cut into pieces
/// of at most `max_len` bytes on character boundaries. At most `max_times`
/// chunks are returned; the rest of the content is dropped. A `max_len` of 0
/// leaves lines uncut.
pub fn chunk_content(content: &str, max_len: usize, max_times: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    if max_times == 0 {
        return chunks;
    }
    if content.is_empty() {
        chunks.push(content);
        return chunks;
    }

    for line in content.lines() {
        let mut rest = line;
        loop {
            if chunks.len() >= max_times {
                return chunks;
            }
            if max_len == 0 || rest.len() <= max_len {
                chunks.push(rest);
                break;
            }

            let mut cut = max_len;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                // a single character wider than max_len
                cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
            }

            let (head, tail) = rest.split_at(cut);
            chunks.push(head);
            if tail.is_empty() {
                break;
            }
            rest = tail;
        }
    }

    chunks
}

/// Local wall-clock rendering of a record time
pub fn format_time(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Pretty JSON lines within the bound stay whole; compact JSON is cut like text
fn content_chunks(info: &LogInfo, max_len: usize, max_times: usize) -> Vec<&str> {
    chunk_content(info.text(), max_len, max_times)
}

fn error_lines(info: &LogInfo) -> Vec<String> {
    let Some(error) = info.error() else {
        return Vec::new();
    };
    let mut lines = vec![error.to_string()];
    lines.extend(error.chain().skip(1).map(|cause| format!("  caused by: {}", cause)));
    lines
}

/// Box-drawn block: header, call site, content, error
#[derive(Debug, Clone)]
pub struct TableFormat {
    max_single_log_length: usize,
    max_print_times: usize,
    header: LogHeader,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_SINGLE_LOG_LENGTH,
            DEFAULT_MAX_PRINT_TIMES,
            LogHeader::default(),
        )
    }
}

impl TableFormat {
    pub fn new(max_single_log_length: usize, max_print_times: usize, header: LogHeader) -> Self {
        Self {
            max_single_log_length,
            max_print_times,
            header,
        }
    }

    fn header_line(&self, info: &LogInfo) -> String {
        let mut parts = Vec::new();
        if self.header.thread {
            parts.push(format!("Thread: {}", info.thread_name()));
        }
        if self.header.tag {
            parts.push(format!("Tag: {}", info.tag()));
        }
        if self.header.level {
            parts.push(format!("Level: {}", info.level()));
        }
        if self.header.time {
            parts.push(format!("Time: {}", format_time(info.time())));
        }
        parts.join(" ")
    }
}

impl LogFormat for TableFormat {
    fn format_lines(&self, info: &LogInfo) -> Vec<String> {
        let mut width = info.print_length().max(MIN_TABLE_WIDTH);
        if self.max_single_log_length > 0 {
            width = width.min(self.max_single_log_length.max(MIN_TABLE_WIDTH));
        }
        let rule = "─".repeat(width + 1);

        let mut lines = vec![format!("┌{}", rule)];
        lines.push(format!("│ {}", self.header_line(info)));
        lines.push(format!("├{}", rule));
        lines.push(format!("│ {}", info.trace()));
        lines.push(format!("├{}", rule));
        for chunk in content_chunks(info, self.max_single_log_length, self.max_print_times) {
            lines.push(format!("│ {}", chunk));
        }

        let errors = error_lines(info);
        if !errors.is_empty() {
            lines.push(format!("├{}", rule));
            lines.extend(errors.into_iter().map(|line| format!("│ {}", line)));
        }
        lines.push(format!("└{}", rule));
        lines
    }
}

/// One line per content chunk, each carrying the record header
#[derive(Debug, Clone)]
pub struct LineFormat {
    max_single_log_length: usize,
    max_print_times: usize,
    header: LogHeader,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_SINGLE_LOG_LENGTH,
            DEFAULT_MAX_PRINT_TIMES,
            LogHeader::default(),
        )
    }
}

impl LineFormat {
    pub fn new(max_single_log_length: usize, max_print_times: usize, header: LogHeader) -> Self {
        Self {
            max_single_log_length,
            max_print_times,
            header,
        }
    }

    fn prefix(&self, info: &LogInfo) -> String {
        let mut prefix = String::new();
        if self.header.time {
            prefix.push_str(&format_time(info.time()));
            prefix.push(' ');
        }
        if self.header.level {
            prefix.push(info.level().short());
            prefix.push('/');
        }
        if self.header.tag {
            prefix.push_str(info.tag());
        }
        if self.header.thread {
            prefix.push_str(&format!(" [{}]", info.thread_name()));
        }
        let trace = info.trace();
        if !trace.is_empty() {
            prefix.push_str(&format!(" ({})", trace));
        }
        prefix
    }
}

impl LogFormat for LineFormat {
    fn format_lines(&self, info: &LogInfo) -> Vec<String> {
        let prefix = self.prefix(info);
        let mut lines: Vec<String> =
            content_chunks(info, self.max_single_log_length, self.max_print_times)
                .into_iter()
                .map(|chunk| format!("{}: {}", prefix, chunk))
                .collect();
        lines.extend(
            error_lines(info)
                .into_iter()
                .map(|line| format!("{}: {}", prefix, line)),
        );
        lines
    }
}

/// [`LineFormat`] colored by level for ANSI terminals
#[derive(Debug, Clone, Default)]
pub struct ColorfulLineFormat {
    inner: LineFormat,
}

impl ColorfulLineFormat {
    pub fn new(inner: LineFormat) -> Self {
        Self { inner }
    }
}

impl LogFormat for ColorfulLineFormat {
    fn format_lines(&self, info: &LogInfo) -> Vec<String> {
        let level = info.level();
        self.inner
            .format_lines(info)
            .into_iter()
            .map(|line| colorize(&line, level))
            .collect()
    }
}

fn colorize(line: &str, level: LogLevel) -> String {
    match level {
        LogLevel::Verbose => line.bright_black().to_string(),
        LogLevel::Debug => line.blue().to_string(),
        LogLevel::Info => line.green().to_string(),
        LogLevel::Warn => line.yellow().to_string(),
        LogLevel::Error => line.red().to_string(),
        LogLevel::Assert => line.magenta().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_respects_print_times() {
        let content = "x".repeat(5000);
        let chunks = chunk_content(&content, 1000, 2);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 1000));
    }

    #[test]
    fn test_chunk_splits_lines_first() {
        let chunks = chunk_content("ab\ncdef\n\ng", 3, usize::MAX);
        assert_eq!(chunks, ["ab", "cde", "f", "", "g"]);
    }

    #[test]
    fn test_chunk_keeps_char_boundaries() {
        let chunks = chunk_content("ééé", 3, usize::MAX);
        assert_eq!(chunks, ["é", "é", "é"]);
        let chunks = chunk_content("日本", 1, usize::MAX);
        assert_eq!(chunks, ["日", "本"]);
    }

    #[test]
    fn test_chunk_wide_char_at_line_end_adds_no_blank_chunk() {
        let chunks = chunk_content("a日\nb", 1, usize::MAX);
        assert_eq!(chunks, ["a", "日", "b"]);
        let chunks = chunk_content("日本語", 2, 2);
        assert_eq!(chunks, ["日", "本"]);
    }

    #[test]
    fn test_chunk_edge_cases() {
        assert_eq!(chunk_content("", 10, 5), [""]);
        assert!(chunk_content("abc", 10, 0).is_empty());
        assert_eq!(chunk_content("abcdef", 0, 5), ["abcdef"]);
    }

    #[test]
    fn test_table_format_layout() {
        let info = LogInfo::new(LogLevel::Warn, "net", "timeout")
            .with_thread_name("worker-1")
            .with_error(anyhow::anyhow!("root cause").context("request failed"));
        let lines = TableFormat::default().format_lines(&info);

        assert!(lines[0].starts_with('┌'));
        assert!(lines[1].contains("Thread: worker-1"));
        assert!(lines[1].contains("Tag: net"));
        assert!(lines[1].contains("Level: WARN"));
        assert!(lines[3].contains("format.rs"));
        assert_eq!(lines[5], "│ timeout");
        assert_eq!(lines[7], "│ request failed");
        assert_eq!(lines[8], "│   caused by: root cause");
        assert!(lines.last().unwrap().starts_with('└'));
    }

    #[test]
    fn test_table_format_truncates_content() {
        let content = "y".repeat(5000);
        let info = LogInfo::new(LogLevel::Info, "t", content.as_str());
        let format = TableFormat::new(1000, 2, LogHeader::default());
        let body: Vec<_> = format
            .format_lines(&info)
            .into_iter()
            .filter(|line| line.starts_with("│ y"))
            .collect();
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_json_content_is_bounded_like_text() {
        let json = format!("{{\"k\":\"{}\"}}", "z".repeat(4992));
        assert_eq!(json.len(), 5000);
        let info = LogInfo::new(LogLevel::Info, "t", "placeholder")
            .with_location(None)
            .with_json_content(json);

        let header = LogHeader {
            thread: false,
            tag: true,
            level: true,
            time: false,
        };
        let lines = LineFormat::new(1000, 2, header).format_lines(&info);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == "I/t: ".len() + 1000));

        let body: Vec<_> = TableFormat::new(1000, 2, LogHeader::default())
            .format_lines(&info)
            .into_iter()
            .filter(|line| line.starts_with("│ {") || line.starts_with("│ z"))
            .collect();
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_pretty_json_lines_stay_whole() {
        let info = LogInfo::new(LogLevel::Info, "t", "placeholder")
            .with_location(None)
            .with_json_content("{\n  \"a\": 1\n}".to_string());
        let header = LogHeader {
            thread: false,
            tag: false,
            level: false,
            time: false,
        };
        let lines = LineFormat::new(1000, usize::MAX, header).format_lines(&info);
        assert_eq!(lines, [": {", ":   \"a\": 1", ": }"]);
    }

    #[test]
    fn test_line_format_prefixes_every_chunk() {
        let header = LogHeader {
            thread: false,
            tag: true,
            level: true,
            time: false,
        };
        let info = LogInfo::new(LogLevel::Info, "app", "one\ntwo").with_location(None);
        let lines = LineFormat::new(1000, usize::MAX, header).format_lines(&info);
        assert_eq!(lines, ["I/app: one", "I/app: two"]);
    }

    #[test]
    fn test_colorful_format_keeps_text() {
        colored::control::set_override(true);
        let info = LogInfo::new(LogLevel::Error, "app", "boom");
        let lines = ColorfulLineFormat::default().format_lines(&info);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("boom"));
        assert!(lines[0].starts_with("\u{1b}["));
    }
}
