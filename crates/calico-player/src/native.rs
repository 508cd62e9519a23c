//! ffplay as the native HLS sink.
//!
//! ffplay takes the manifest URL directly and does its own HLS handling, so
//! it stands in for a media element with built-in HLS support.  There is no
//! control channel: progress comes from the `-stats` line on stderr and the
//! outcome from the exit status.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{is_hls_mime, MediaSignal, MediaSink, Signal, SignalSender};

#[derive(Default)]
pub struct NativeSink {
    source: Option<String>,
    stop: Option<CancellationToken>,
}

impl NativeSink {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn ffplay_args(url: &str, volume: f32) -> Vec<String> {
    vec![
        "-nodisp".to_string(),
        "-autoexit".to_string(),
        "-loglevel".to_string(),
        "warning".to_string(),
        "-stats".to_string(),
        "-volume".to_string(),
        ((volume * 100.0).clamp(0.0, 100.0).round() as i64).to_string(),
        url.to_string(),
    ]
}

#[async_trait]
impl MediaSink for NativeSink {
    fn name(&self) -> &'static str {
        "ffplay"
    }

    fn can_play_type(&self, mime: &str) -> bool {
        is_hls_mime(mime) && calico_proto::platform::find_ffplay_binary().is_some()
    }

    async fn set_source(
        &mut self,
        url: &str,
        volume: f32,
        signals: SignalSender,
    ) -> anyhow::Result<()> {
        self.shutdown().await;

        let binary = calico_proto::platform::find_ffplay_binary()
            .ok_or_else(|| anyhow::anyhow!("ffplay binary not found"))?;
        let mut child = tokio::process::Command::new(&binary)
            .args(ffplay_args(url, volume))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        info!("ffplay: spawned pid={:?} for {}", child.id(), url);

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("ffplay stderr not captured"))?;

        let token = CancellationToken::new();
        self.stop = Some(token.clone());
        self.source = Some(url.to_string());

        let _ = signals.send(Signal::Media(MediaSignal::LoadStart)).await;
        tokio::spawn(watch_ffplay(child, stderr, signals, token));
        Ok(())
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    async fn shutdown(&mut self) {
        if let Some(token) = self.stop.take() {
            token.cancel();
        }
    }
}

/// Tracks ffplay's stderr to tell when audio starts flowing.
#[derive(Debug, Default)]
pub struct FfplayProgress {
    started: bool,
    last_line: String,
}

impl FfplayProgress {
    /// Feed a chunk of stderr.  The first stats line (it carries the audio
    /// queue size, `aq=`) means playback has started.
    pub fn feed(&mut self, chunk: &str) -> Vec<MediaSignal> {
        let mut signals = Vec::new();
        for line in chunk.split(['\r', '\n']).map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if line.contains("aq=") {
                if !self.started {
                    self.started = true;
                    signals.push(MediaSignal::CanPlay);
                    signals.push(MediaSignal::Playing);
                }
            } else {
                debug!("ffplay: {}", line);
                self.last_line = line.to_string();
            }
        }
        signals
    }

    /// Final signal for an exit with `success`.
    pub fn finish(&self, success: bool) -> MediaSignal {
        if success {
            MediaSignal::Ended
        } else if self.last_line.is_empty() {
            MediaSignal::Error("ffplay exited".to_string())
        } else {
            MediaSignal::Error(self.last_line.clone())
        }
    }
}

async fn watch_ffplay(
    mut child: Child,
    stderr: ChildStderr,
    signals: SignalSender,
    token: CancellationToken,
) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut progress = FfplayProgress::default();

    loop {
        buf.clear();
        tokio::select! {
            _ = token.cancelled() => {
                let _ = child.kill().await;
                debug!("ffplay: stopped");
                return;
            }
            read = reader.read_until(b'\r', &mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    for signal in progress.feed(&String::from_utf8_lossy(&buf)) {
                        if signals.send(Signal::Media(signal)).await.is_err() {
                            let _ = child.kill().await;
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("ffplay: stderr read error: {}", e);
                    break;
                }
            },
        }
    }

    let success = match child.wait().await {
        Ok(status) => {
            info!("ffplay: exited with {}", status);
            status.success()
        }
        Err(e) => {
            warn!("ffplay: wait failed: {}", e);
            false
        }
    };
    let _ = signals.send(Signal::Media(progress.finish(success))).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stats_line_starts_playback_once() {
        let mut p = FfplayProgress::default();
        assert!(p
            .feed("Input #0, hls, from 'https://x.test/live.m3u8':\n")
            .is_empty());
        assert_eq!(
            p.feed("   1.02 M-A:  0.000 fd=   0 aq=   22KB vq=    0KB sq=    0B \r"),
            vec![MediaSignal::CanPlay, MediaSignal::Playing]
        );
        assert!(p
            .feed("   1.52 M-A:  0.000 fd=   0 aq=   30KB vq=    0KB sq=    0B \r")
            .is_empty());
        assert_eq!(p.finish(true), MediaSignal::Ended);
    }

    #[test]
    fn failure_reports_last_diagnostic_line() {
        let mut p = FfplayProgress::default();
        p.feed("https://x.test/live.m3u8: Server returned 404 Not Found\n");
        assert_eq!(
            p.finish(false),
            MediaSignal::Error("https://x.test/live.m3u8: Server returned 404 Not Found".into())
        );
        assert_eq!(
            FfplayProgress::default().finish(false),
            MediaSignal::Error("ffplay exited".into())
        );
    }

    #[test]
    fn volume_is_a_percentage() {
        let args = ffplay_args("https://x.test/live.m3u8", 0.5);
        let idx = args.iter().position(|a| a == "-volume").unwrap();
        assert_eq!(args[idx + 1], "50");
        assert_eq!(args.last().map(String::as_str), Some("https://x.test/live.m3u8"));
    }
}
