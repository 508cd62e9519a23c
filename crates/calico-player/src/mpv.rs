/// mpv-backed adaptive streaming engine.
///
/// ```text
///   MpvEngine::attach()
///         │
///         ├── MpvDriver::spawn_and_connect()
///         │     ├── writer_task  ← MpvRequest via mpsc, serialised → socket
///         │     └── reader_task  ← JSON lines from socket
///         │                          ├── response (request_id) → oneshot
///         │                          └── event / property-change → MpvEvent
///         └── signal_task        ← MpvEvent → SignalTranslator → Signal
/// ```
///
/// mpv parses the HLS manifest itself.  Each audio track in mpv's
/// `track-list` is one level; `aid` names the one being played.
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use calico_proto::config::EngineConfig;
use calico_proto::protocol::{LevelInfo, LevelSnapshot, AUTO_LEVEL};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use crate::engine::{MediaSignal, Signal, SignalSender, StreamEngine, StreamSignal};

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

pub const OBS_CORE_IDLE: u64 = 1;
pub const OBS_PAUSE: u64 = 2;
pub const OBS_TRACK_LIST: u64 = 3;
pub const OBS_AID: u64 = 4;

/// Bytes per second of 16-bit stereo PCM at 44.1 kHz, used to size the
/// back buffer from a duration.
const BACK_BUFFER_BYTES_PER_SEC: u64 = 176_400;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct MpvRequest {
    req_id: u64,
    /// Serialised JSON line, newline included.
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An event or property-change mpv pushed without being asked.
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? != "property-change" {
            return None;
        }
        let id = self.raw.get("id")?.as_u64()?;
        Some((id, self.raw.get("data").unwrap_or(&Value::Null)))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key)?.as_str()
    }
}

// ── handle ────────────────────────────────────────────────────────────────────

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<MpvRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_string(&json!({
            "command": command,
            "request_id": req_id,
        }))?;
        payload.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MpvRequest {
                req_id,
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub async fn load_stream(&self, url: &str) -> anyhow::Result<()> {
        debug!("mpv: loadfile {}", url);
        self.send(json!(["loadfile", url])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn get_property(&self, name: &str) -> anyhow::Result<Value> {
        let resp = self.send(json!(["get_property", name])).await?;
        Ok(resp.get("data").cloned().unwrap_or(Value::Null))
    }

    pub async fn quit(&self) {
        let _ = self.send(json!(["quit"])).await;
    }

    /// Register every property the signal translator reads.  mpv pushes a
    /// property-change for each right away and on every change after.
    pub async fn observe_all_properties(&self) {
        let props = [
            (OBS_CORE_IDLE, "core-idle"),
            (OBS_PAUSE, "pause"),
            (OBS_TRACK_LIST, "track-list"),
            (OBS_AID, "aid"),
        ];
        for (id, name) in &props {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new() -> Self {
        Self {
            socket_name: calico_proto::platform::mpv_socket_name(),
            process: None,
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;
    }

    /// Command-line for a fresh mpv with the engine options applied.
    pub fn build_args(&self, options: &EngineConfig, volume: f32) -> Vec<String> {
        let mut args = vec![
            "--no-video".to_string(),
            "--idle=yes".to_string(),
            calico_proto::platform::mpv_socket_arg(&self.socket_name),
            format!(
                "--volume={}",
                (volume * 100.0).clamp(0.0, 100.0).round() as i64
            ),
        ];
        if options.debug {
            args.push("--msg-level=all=v".to_string());
        } else {
            args.push("--quiet".to_string());
        }
        args.push(format!(
            "--demuxer-thread={}",
            if options.enable_worker { "yes" } else { "no" }
        ));
        if options.low_latency {
            args.push("--profile=low-latency".to_string());
        }
        args.push(format!(
            "--demuxer-max-back-bytes={}",
            options.back_buffer_secs * BACK_BUFFER_BYTES_PER_SEC
        ));
        args
    }

    fn spawn_process(&mut self, args: &[String]) -> anyhow::Result<()> {
        let mpv_binary = calico_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let stderr_path = calico_proto::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        info!("mpv: logging stderr to {:?}", stderr_path);

        let child = tokio::process::Command::new(&mpv_binary)
            .args(args)
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned {:?} pid={:?}", mpv_binary, child.id());
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        options: &EngineConfig,
        volume: f32,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        let socket_path = std::path::PathBuf::from(&self.socket_name);

        let args = self.build_args(options, volume);
        self.spawn_process(&args)?;

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(read_half, write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        options: &EngineConfig,
        volume: f32,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        let args = self.build_args(options, volume);
        self.spawn_process(&args)?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(read_half, write_half, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

impl Default for MpvDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn start_io_tasks<R, W>(read_half: R, write_half: W, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // req_id → reply channel; the writer inserts, the reader resolves.
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<MpvRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

async fn fail_pending(pending: &Pending, why: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("mpv IPC {}", why)));
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: Pending,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                match val.get("request_id").and_then(|v| v.as_u64()) {
                    Some(req_id) => {
                        let Some(tx) = pending.lock().await.remove(&req_id) else {
                            debug!("mpv reader: response for unknown req={}", req_id);
                            continue;
                        };
                        let result = match val["error"].as_str() {
                            Some("success") => Ok(val),
                            other => Err(anyhow::anyhow!(
                                "mpv error: {}",
                                other.unwrap_or("unknown error")
                            )),
                        };
                        let _ = tx.send(result);
                    }
                    None => {
                        if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<MpvRequest>, pending: Pending)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── signal translation ────────────────────────────────────────────────────────

/// Turns mpv events into engine signals.  Pure; the caller feeds it events
/// and the `track-list` value.
#[derive(Debug, Default)]
pub struct SignalTranslator {
    /// mpv track ids of the audio tracks, in level order.
    audio_ids: Vec<i64>,
    levels: Vec<LevelInfo>,
    current_level: Option<i32>,
    manifest_parsed: bool,
    core_idle: Option<bool>,
    paused: bool,
}

impl SignalTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the level list from mpv's `track-list`.  True when it changed.
    pub fn set_track_list(&mut self, data: &Value) -> bool {
        let Some(tracks) = data.as_array() else {
            return false;
        };
        let mut ids = Vec::new();
        let mut levels = Vec::new();
        let mut selected = None;
        for track in tracks.iter().filter(|t| t["type"].as_str() == Some("audio")) {
            let Some(id) = track["id"].as_i64() else {
                continue;
            };
            ids.push(id);
            levels.push(level_from_track(track));
            if track["selected"].as_bool() == Some(true) {
                selected = Some(levels.len() as i32 - 1);
            }
        }
        // An index into the previous list means nothing for this one.
        self.current_level = selected;
        let changed = levels != self.levels;
        self.audio_ids = ids;
        self.levels = levels;
        changed
    }

    pub fn on_event(&mut self, evt: &MpvEvent) -> Vec<Signal> {
        if let Some((id, data)) = evt.as_property_change() {
            return self.on_property(id, data);
        }
        match evt.event_name() {
            Some("start-file") => {
                self.manifest_parsed = false;
                vec![Signal::Media(MediaSignal::LoadStart)]
            }
            Some("file-loaded") => {
                self.manifest_parsed = true;
                vec![
                    Signal::Stream(StreamSignal::ManifestParsed(LevelSnapshot {
                        levels: self.levels.clone(),
                        current_level: self.current_level.unwrap_or(AUTO_LEVEL),
                    })),
                    Signal::Media(MediaSignal::CanPlay),
                ]
            }
            Some("end-file") => match evt.str_field("reason").unwrap_or("unknown") {
                "eof" => vec![Signal::Media(MediaSignal::Ended)],
                "error" => {
                    let details = evt.str_field("file_error").unwrap_or("unknown error");
                    vec![
                        Signal::Media(MediaSignal::Error(details.to_string())),
                        Signal::Stream(StreamSignal::Error {
                            details: details.to_string(),
                            fatal: true,
                        }),
                    ]
                }
                reason => {
                    debug!("mpv: end-file reason={}", reason);
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }

    fn on_property(&mut self, id: u64, data: &Value) -> Vec<Signal> {
        match id {
            OBS_CORE_IDLE => {
                let idle = data.as_bool();
                if idle == self.core_idle {
                    return Vec::new();
                }
                self.core_idle = idle;
                if idle == Some(false) && !self.paused {
                    vec![Signal::Media(MediaSignal::Playing)]
                } else {
                    Vec::new()
                }
            }
            OBS_PAUSE => {
                let paused = data.as_bool().unwrap_or(false);
                if paused == self.paused {
                    return Vec::new();
                }
                self.paused = paused;
                if paused {
                    vec![Signal::Media(MediaSignal::Pause)]
                } else if self.core_idle == Some(false) {
                    vec![Signal::Media(MediaSignal::Playing)]
                } else {
                    Vec::new()
                }
            }
            OBS_TRACK_LIST => {
                if self.set_track_list(data) && self.manifest_parsed {
                    vec![Signal::Stream(StreamSignal::LevelsUpdated(self.levels.clone()))]
                } else {
                    Vec::new()
                }
            }
            OBS_AID => {
                let level = data
                    .as_i64()
                    .and_then(|aid| self.audio_ids.iter().position(|id| *id == aid))
                    .map(|idx| idx as i32)
                    .unwrap_or(AUTO_LEVEL);
                if Some(level) == self.current_level {
                    return Vec::new();
                }
                self.current_level = Some(level);
                if self.manifest_parsed {
                    vec![Signal::Stream(StreamSignal::LevelSwitched { level })]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Level description of one `track-list` audio entry.  AAC is reported
/// with its RFC 6381 object type so it lines up with manifest codecs.
fn level_from_track(track: &Value) -> LevelInfo {
    let bitrate = track["hls-bitrate"]
        .as_u64()
        .or_else(|| track["demux-bitrate"].as_u64())
        .filter(|b| *b > 0);
    let audio_codec = track["codec"].as_str().map(|codec| {
        match (codec, track["codec-profile"].as_str()) {
            ("aac", Some("LC")) => "mp4a.40.2".to_string(),
            ("aac", Some(p)) if p.starts_with("HE-AAC") => "mp4a.40.5".to_string(),
            (other, _) => other.to_string(),
        }
    });
    LevelInfo {
        bitrate,
        audio_codec,
    }
}

// ── engine ────────────────────────────────────────────────────────────────────

pub struct MpvEngine {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    signal_task: Option<JoinHandle<()>>,
}

impl MpvEngine {
    pub fn new() -> Self {
        Self {
            driver: MpvDriver::new(),
            handle: None,
            signal_task: None,
        }
    }
}

impl Default for MpvEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamEngine for MpvEngine {
    fn name(&self) -> &'static str {
        "mpv"
    }

    fn is_supported(&self) -> bool {
        calico_proto::platform::find_mpv_binary().is_some()
    }

    async fn attach(
        &mut self,
        manifest_url: &str,
        options: &EngineConfig,
        volume: f32,
        signals: SignalSender,
    ) -> anyhow::Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(256);
        let handle = self
            .driver
            .spawn_and_connect(options, volume, event_tx)
            .await?;
        handle.observe_all_properties().await;

        let task_handle = handle.clone();
        self.signal_task = Some(tokio::spawn(async move {
            let mut translator = SignalTranslator::new();
            while let Some(evt) = event_rx.recv().await {
                if evt.event_name() == Some("file-loaded") {
                    // The observed track-list can lag behind file-loaded.
                    match task_handle.get_property("track-list").await {
                        Ok(list) => {
                            translator.set_track_list(&list);
                        }
                        Err(e) => warn!("mpv: track-list query failed: {}", e),
                    }
                }
                for signal in translator.on_event(&evt) {
                    if signals.send(signal).await.is_err() {
                        return;
                    }
                }
            }
            debug!("mpv: signal task exiting");
        }));

        handle.load_stream(manifest_url).await?;
        self.handle = Some(handle);
        Ok(())
    }

    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()> {
        match &self.handle {
            Some(handle) => handle.set_pause(paused).await,
            None => anyhow::bail!("mpv is not running"),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.quit().await;
        }
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
        self.driver.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(raw: Value) -> MpvEvent {
        MpvEvent { raw }
    }

    fn track_list() -> Value {
        json!([
            {"id": 1, "type": "audio", "codec": "aac", "codec-profile": "LC",
             "hls-bitrate": 128000, "selected": false},
            {"id": 2, "type": "audio", "codec": "flac", "demux-bitrate": 1411200,
             "selected": true},
            {"id": 1, "type": "video", "codec": "mjpeg"}
        ])
    }

    #[test]
    fn args_follow_engine_options() {
        let driver = MpvDriver {
            socket_name: "/tmp/test.sock".into(),
            process: None,
        };
        let args = driver.build_args(&EngineConfig::default(), 0.5);
        assert!(args.contains(&"--volume=50".to_string()));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--demuxer-thread=yes".to_string()));
        assert!(args.contains(&"--profile=low-latency".to_string()));
        assert!(args.contains(&format!("--demuxer-max-back-bytes={}", 90 * 176_400)));

        let debug = EngineConfig {
            debug: true,
            enable_worker: false,
            low_latency: false,
            back_buffer_secs: 0,
        };
        let args = driver.build_args(&debug, 1.0);
        assert!(args.contains(&"--msg-level=all=v".to_string()));
        assert!(args.contains(&"--demuxer-thread=no".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--profile")));
    }

    #[test]
    fn track_list_becomes_levels() {
        let mut t = SignalTranslator::new();
        assert!(t.set_track_list(&track_list()));
        assert_eq!(t.audio_ids, vec![1, 2]);
        assert_eq!(
            t.levels,
            vec![
                LevelInfo {
                    bitrate: Some(128_000),
                    audio_codec: Some("mp4a.40.2".into())
                },
                LevelInfo {
                    bitrate: Some(1_411_200),
                    audio_codec: Some("flac".into())
                },
            ]
        );
        assert_eq!(t.current_level, Some(1));
        assert!(!t.set_track_list(&track_list()));
    }

    #[test]
    fn track_list_without_selection_clears_current_level() {
        let mut t = SignalTranslator::new();
        t.set_track_list(&track_list());
        assert_eq!(t.current_level, Some(1));

        assert!(t.set_track_list(&json!([
            {"id": 1, "type": "audio", "selected": false, "demux-bitrate": 64000, "codec": "opus"}
        ])));
        assert_eq!(t.audio_ids, vec![1]);
        assert_eq!(t.current_level, None);
    }

    #[test]
    fn load_sequence_emits_manifest_then_canplay() {
        let mut t = SignalTranslator::new();
        assert_eq!(
            t.on_event(&event(json!({"event": "start-file"}))),
            vec![Signal::Media(MediaSignal::LoadStart)]
        );
        // Before file-loaded, track-list changes are only recorded.
        assert!(t
            .on_event(&event(json!({
                "event": "property-change", "id": OBS_TRACK_LIST, "data": track_list()
            })))
            .is_empty());

        let signals = t.on_event(&event(json!({"event": "file-loaded"})));
        assert_eq!(signals.len(), 2);
        match &signals[0] {
            Signal::Stream(StreamSignal::ManifestParsed(snap)) => {
                assert_eq!(snap.levels.len(), 2);
                assert_eq!(snap.current_level, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(signals[1], Signal::Media(MediaSignal::CanPlay));

        assert_eq!(
            t.on_event(&event(json!({"event": "property-change", "id": OBS_AID, "data": 1}))),
            vec![Signal::Stream(StreamSignal::LevelSwitched { level: 0 })]
        );
    }

    #[test]
    fn idle_and_pause_map_to_playing_and_pause() {
        let mut t = SignalTranslator::new();
        let idle = |v: bool| {
            event(json!({"event": "property-change", "id": OBS_CORE_IDLE, "data": v}))
        };
        let pause =
            |v: bool| event(json!({"event": "property-change", "id": OBS_PAUSE, "data": v}));

        assert!(t.on_event(&idle(true)).is_empty());
        assert_eq!(t.on_event(&idle(false)), vec![Signal::Media(MediaSignal::Playing)]);
        assert!(t.on_event(&idle(false)).is_empty());
        assert_eq!(t.on_event(&pause(true)), vec![Signal::Media(MediaSignal::Pause)]);
        assert_eq!(t.on_event(&pause(false)), vec![Signal::Media(MediaSignal::Playing)]);
    }

    #[test]
    fn end_file_reasons() {
        let mut t = SignalTranslator::new();
        assert_eq!(
            t.on_event(&event(json!({"event": "end-file", "reason": "eof"}))),
            vec![Signal::Media(MediaSignal::Ended)]
        );
        let signals = t.on_event(&event(json!({
            "event": "end-file", "reason": "error", "file_error": "loading failed"
        })));
        assert_eq!(
            signals,
            vec![
                Signal::Media(MediaSignal::Error("loading failed".into())),
                Signal::Stream(StreamSignal::Error {
                    details: "loading failed".into(),
                    fatal: true
                }),
            ]
        );
        assert!(t
            .on_event(&event(json!({"event": "end-file", "reason": "stop"})))
            .is_empty());
    }
}
