//! Structured log output for every message

use once_cell::sync::Lazy;
use regex::Regex;
use run_result_common::{Context, LogLevel, Message};
use tracing::{debug, error, info, trace, warn, Level};

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("valid ANSI regex"));

/// Tracing level a severity is logged at
pub fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Critical | LogLevel::Error => Level::ERROR,
        LogLevel::Warning | LogLevel::Notice => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::NotSet => Level::TRACE,
    }
}

/// Strip terminal colors and chat markup, then lower-case
pub fn clean_text(text: &str) -> String {
    ANSI_ESCAPE
        .replace_all(text, "")
        .chars()
        .filter(|c| *c != '*' && *c != '`')
        .collect::<String>()
        .to_lowercase()
}

fn render(context: &Context) -> String {
    serde_json::to_string(context).unwrap_or_default()
}

/// Log sink carrying the run's global tags
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    global_tags: Context,
}

impl LogSink {
    pub fn new(global_tags: Context) -> Self {
        Self { global_tags }
    }

    pub fn log(&self, level: LogLevel, text: &str, error: Option<&str>, context: &Context) {
        let text = clean_text(text);
        let context = render(context);
        let tags = render(&self.global_tags);
        let error = error.unwrap_or_default();

        match tracing_level(level) {
            Level::ERROR => error!(severity = %level, context = %context, tags = %tags, error = %error, "{}", text),
            Level::WARN => warn!(severity = %level, context = %context, tags = %tags, error = %error, "{}", text),
            Level::INFO => info!(severity = %level, context = %context, tags = %tags, error = %error, "{}", text),
            Level::DEBUG => debug!(severity = %level, context = %context, tags = %tags, error = %error, "{}", text),
            _ => trace!(severity = %level, context = %context, tags = %tags, error = %error, "{}", text),
        }
    }

    pub fn log_message(&self, message: &Message) {
        self.log(
            message.level,
            &message.message,
            message.error.as_deref(),
            &message.context,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rstest::rstest;
    use std::io::Write;
    use std::sync::Arc;

    #[rstest]
    #[case(LogLevel::Critical, Level::ERROR)]
    #[case(LogLevel::Error, Level::ERROR)]
    #[case(LogLevel::Warning, Level::WARN)]
    #[case(LogLevel::Notice, Level::WARN)]
    #[case(LogLevel::Info, Level::INFO)]
    #[case(LogLevel::Debug, Level::DEBUG)]
    #[case(LogLevel::NotSet, Level::TRACE)]
    fn test_tracing_level(#[case] level: LogLevel, #[case] expected: Level) {
        assert_eq!(tracing_level(level), expected);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("\x1b[31m*[ERROR]*\x1b[0m model `DB.SCHEMA.T`"),
            "[error] model db.schema.t"
        );
        assert_eq!(clean_text("plain"), "plain");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_emits_fields() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut context = Context::new();
        context.insert("name", "orders");
        let mut global = Context::new();
        global.insert("env", "dev");

        tracing::subscriber::with_default(subscriber, || {
            LogSink::new(global).log(
                LogLevel::Warning,
                "*[WARN]* Test orders",
                Some("Got 1 results, expected 0"),
                &context,
            );
        });

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("[warn] test orders"));
        assert!(output.contains("severity=WARNING"));
        assert!(output.contains("Got 1 results, expected 0"));
        assert!(output.contains(r#""name":"orders""#));
    }
}
