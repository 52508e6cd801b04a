use anyhow::Result;
use async_trait::async_trait;
use plexnp_core::{ActionSink, ChannelRef, DebugSink};
use std::sync::{Arc, Mutex};

/// Prints actions the way a chat client shows `/me` lines
pub struct StdoutActionSink {
    nick: String,
}

impl StdoutActionSink {
    pub fn new(nick: impl Into<String>) -> Self {
        Self { nick: nick.into() }
    }

    pub fn format(&self, text: &str, channel: &ChannelRef) -> String {
        format!("[{}] * {} {}", channel, self.nick, text)
    }
}

#[async_trait]
impl ActionSink for StdoutActionSink {
    async fn send_action(&self, text: &str, channel: &ChannelRef) -> Result<()> {
        println!("{}", self.format(text, channel));
        Ok(())
    }
}

/// Debug notices on stderr, out of the action stream
pub struct StderrDebugSink;

impl DebugSink for StderrDebugSink {
    fn report_debug(&self, text: &str) {
        eprintln!("-- {}", text);
    }
}

/// Debug notices into the log only (used while watching)
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn report_debug(&self, text: &str) {
        tracing::debug!("{}", text);
    }
}

/// Forwards an action only when it differs from the last one forwarded
pub struct ChangedOnlySink {
    inner: Arc<dyn ActionSink>,
    last: Mutex<Option<String>>,
}

impl ChangedOnlySink {
    pub fn new(inner: Arc<dyn ActionSink>) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    /// Forget the last line so the next one is always forwarded
    pub fn reset(&self) {
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
    }

    fn is_new(&self, text: &str) -> bool {
        match self.last.lock() {
            Ok(last) => last.as_deref() != Some(text),
            Err(_) => true,
        }
    }

    fn remember(&self, text: &str) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(text.to_string());
        }
    }
}

#[async_trait]
impl ActionSink for ChangedOnlySink {
    async fn send_action(&self, text: &str, channel: &ChannelRef) -> Result<()> {
        if !self.is_new(text) {
            tracing::debug!("Unchanged, not reposting: {}", text);
            return Ok(());
        }

        // Only a line that went out counts as posted
        self.inner.send_action(text, channel).await?;
        self.remember(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl ActionSink for Collect {
        async fn send_action(&self, text: &str, _channel: &ChannelRef) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_action_line_format() {
        let sink = StdoutActionSink::new("alex");
        assert_eq!(
            sink.format(
                "is currently watching Arrival (2016) by Paramount on Plex",
                &ChannelRef::new("#movies")
            ),
            "[#movies] * alex is currently watching Arrival (2016) by Paramount on Plex"
        );
    }

    #[tokio::test]
    async fn test_changed_only_sink() {
        let collected = Arc::new(Collect::default());
        let sink = ChangedOnlySink::new(collected.clone());
        let channel = ChannelRef::new("#plex");

        sink.send_action("a", &channel).await.unwrap();
        sink.send_action("a", &channel).await.unwrap();
        sink.send_action("b", &channel).await.unwrap();
        sink.reset();
        sink.send_action("b", &channel).await.unwrap();

        assert_eq!(collected.0.lock().unwrap().as_slice(), ["a", "b", "b"]);
    }

    /// Fails the first `failures` sends, then records like `Collect`
    struct Flaky {
        failures: Mutex<usize>,
        sent: Collect,
    }

    #[async_trait]
    impl ActionSink for Flaky {
        async fn send_action(&self, text: &str, channel: &ChannelRef) -> Result<()> {
            {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    anyhow::bail!("connection reset");
                }
            }
            self.sent.send_action(text, channel).await
        }
    }

    #[tokio::test]
    async fn test_changed_only_sink_retries_after_failed_send() {
        let flaky = Arc::new(Flaky {
            failures: Mutex::new(1),
            sent: Collect::default(),
        });
        let sink = ChangedOnlySink::new(flaky.clone());
        let channel = ChannelRef::new("#plex");

        assert!(sink.send_action("a", &channel).await.is_err());
        sink.send_action("a", &channel).await.unwrap();
        sink.send_action("a", &channel).await.unwrap();

        assert_eq!(flaky.sent.0.lock().unwrap().as_slice(), ["a"]);
    }
}
