use super::{GlobalTags, MetricsError, MetricsSink, Observations};
use async_trait::async_trait;
use run_result_common::{Context, Message};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// DogStatsD metric types used here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Timer,
    Counter,
}

impl MetricKind {
    fn code(&self) -> &'static str {
        match self {
            MetricKind::Timer => "ms",
            MetricKind::Counter => "c",
        }
    }
}

/// Sorted, de-duplicated `key:value` tags; null context values are skipped.
///
/// `,` and `|` delimit tags and fields on the wire, so they become `_`.
pub fn merge_tags(context: &Context, global: &Context) -> Vec<String> {
    context
        .to_tags()
        .into_iter()
        .chain(global.to_tags())
        .map(|tag| tag.replace([',', '|'], "_"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One DogStatsD line: `name:value|type|#tag,tag`
fn format_line(name: &str, value: f64, kind: MetricKind, tags: &[String]) -> String {
    let mut line = format!("{}:{}|{}", name, value, kind.code());
    if !tags.is_empty() {
        line.push_str("|#");
        line.push_str(&tags.join(","));
    }
    line
}

/// Metrics sink writing DogStatsD datagrams to an agent
pub struct StatsdMonitor {
    socket: UdpSocket,
    prefix: String,
    global_tags: Context,
}

impl StatsdMonitor {
    /// Bind an ephemeral local socket and connect it to the agent
    pub async fn connect(
        host: &str,
        port: u16,
        prefix: &str,
        tags: &GlobalTags,
    ) -> Result<Self, MetricsError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host, port)).await?;
        debug!(host = %host, port = port, "statsd socket connected");

        Ok(Self {
            socket,
            prefix: prefix.to_string(),
            global_tags: tags.to_context(),
        })
    }

    /// Lines recorded for one message, in send order
    pub fn lines_for(&self, message: &Message) -> Vec<String> {
        let observations = Observations::from_message(message);
        let tags = merge_tags(&message.context, &self.global_tags);
        let mut lines = Vec::new();

        for (phase, seconds) in &observations.phases {
            lines.push(format_line(
                &format!("{}.{}.time", self.prefix, phase),
                seconds * 1000.0,
                MetricKind::Timer,
                &tags,
            ));
        }
        if let Some(execution_time) = observations.execution_time {
            lines.push(format_line(
                &format!("{}.run.time", self.prefix),
                execution_time * 1000.0,
                MetricKind::Timer,
                &tags,
            ));
        }
        // already in the unit of the freshness threshold
        if let Some(age) = observations.freshness_age {
            lines.push(format_line(
                &format!("{}.freshness.age", self.prefix),
                age,
                MetricKind::Timer,
                &tags,
            ));
        }
        if let Some(rows) = observations.rows {
            lines.push(format_line(
                &format!("{}.rows.moved", self.prefix),
                rows as f64,
                MetricKind::Counter,
                &tags,
            ));
        }

        lines
    }

    async fn send(&self, line: &str) -> Result<(), MetricsError> {
        self.socket.send(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for StatsdMonitor {
    async fn report(&self, message: &Message) -> Result<(), MetricsError> {
        for line in self.lines_for(message) {
            self.send(&line).await?;
        }
        Ok(())
    }

    async fn command_time(&self, elapsed: Duration) -> Result<(), MetricsError> {
        let tags = merge_tags(&Context::new(), &self.global_tags);
        let line = format_line(
            &format!("{}.command.time", self.prefix),
            elapsed.as_secs_f64() * 1000.0,
            MetricKind::Timer,
            &tags,
        );
        self.send(&line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_merge_tags() {
        let mut context = Context::new();
        context.insert("name", "orders");
        context.insert("updated_at", Value::Null);
        context.insert("env", "dev");
        let mut global = Context::new();
        global.insert("env", "dev");
        global.insert("app", "dbt");

        assert_eq!(
            merge_tags(&context, &global),
            vec!["app:dbt", "env:dev", "name:orders"]
        );
    }

    #[test]
    fn test_merge_tags_keeps_delimiters_out_of_values() {
        let mut context = Context::new();
        context.insert("tags", "daily, pii");
        context.insert("message", "a|b");

        let tags = merge_tags(&context, &Context::new());
        assert_eq!(tags, vec!["message:a_b", "tags:daily_ pii"]);

        let line = format_line("dbt.rows.moved", 1.0, MetricKind::Counter, &tags);
        assert_eq!(line.split("|#").nth(1).map(|t| t.split(',').count()), Some(2));
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line("dbt.rows.moved", 5.0, MetricKind::Counter, &["env:dev".to_string()]),
            "dbt.rows.moved:5|c|#env:dev"
        );
        assert_eq!(
            format_line("dbt.run.time", 1500.0, MetricKind::Timer, &[]),
            "dbt.run.time:1500|ms"
        );
    }
}
