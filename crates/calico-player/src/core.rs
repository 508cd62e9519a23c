/// PlayerCore — single-owner event loop for the page state.
///
/// Runs embedded in the TUI process.  Everything that wants to change what
/// the page shows sends a `PlayerEvent` to this loop: key presses, engine
/// signals, the metadata poll timer and the completions of the HTTP calls
/// the loop itself started.  PlayerCore owns `PageState`, the stream engine
/// and the native sink exclusively; no other task touches them.
///
/// After every event the current `PageState` is published on a
/// `tokio::sync::watch` channel.  The TUI only ever reads that snapshot.
///
/// Every task the core spawns (poll timer, fetches, cover loads, the
/// message-clear timer) hangs off one `CancellationToken`, so dropping out
/// of the loop stops all of them.
///
/// The engine and the sink live on a separate stream task.  Attaching and
/// pausing can take seconds with a real player, so the loop only queues
/// `StreamCommand`s to it and keeps serving polls and keys meanwhile.
use std::future::Future;

use calico_proto::api::{ApiClient, ApiError, CoverImage};
use calico_proto::config::Config;
use calico_proto::metadata::MetadataPayload;
use calico_proto::protocol::{Command, RatingState, Track, Vote};
use calico_proto::config::EngineConfig;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::{MediaSignal, MediaSink, Signal, SignalSender, StreamEngine, StreamSignal};
use crate::page::{AttachMode, Effect, PageState, RateOutcome};

// ── PlayerEvent ───────────────────────────────────────────────────────────────

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum PlayerEvent {
    /// A command from the TUI.
    ClientCommand(Command),
    /// Forwarded from the engine or the sink.
    Signal(Signal),
    /// Metadata poll timer fired.
    PollTick,
    MetadataFetched(Result<MetadataPayload, String>),
    RatingsLoaded {
        track: Track,
        result: Result<RatingState, String>,
    },
    RateFinished {
        track: Track,
        outcome: RateOutcome,
    },
    CoverLoaded {
        seq: u64,
        result: Result<CoverImage, String>,
    },
    /// Message-clear timer fired.
    ClearMessage,
    /// The stream task could not attach the engine or set the sink source.
    AttachFailed(String),
    Shutdown,
}

/// Work queued for the stream task, run in order after the attach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamCommand {
    SetPaused(bool),
}

/// Which backend the stream task drives.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Route {
    Adaptive,
    Native,
    Unsupported,
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    config: Config,
    api: ApiClient,
    /// Handed to the stream task on start.
    backends: Option<(Box<dyn StreamEngine>, Box<dyn MediaSink>)>,
    stream_tx: Option<mpsc::Sender<StreamCommand>>,
    stream_task: Option<JoinHandle<()>>,
    /// Completions of spawned tasks come back through here.
    event_tx: mpsc::Sender<PlayerEvent>,
    page: PageState,
    state_tx: watch::Sender<PageState>,
    /// Parent of every task this core spawns.
    tasks: CancellationToken,
    /// The cover load in flight; cancelled when a newer one starts.
    cover_token: Option<CancellationToken>,
}

impl PlayerCore {
    pub fn new(
        config: Config,
        api: ApiClient,
        engine: Box<dyn StreamEngine>,
        sink: Box<dyn MediaSink>,
        event_tx: mpsc::Sender<PlayerEvent>,
    ) -> (Self, watch::Receiver<PageState>) {
        let page = PageState::new();
        let (state_tx, state_rx) = watch::channel(page.clone());
        let core = Self {
            config,
            api,
            backends: Some((engine, sink)),
            stream_tx: None,
            stream_task: None,
            event_tx,
            page,
            state_tx,
            tasks: CancellationToken::new(),
            cover_token: None,
        };
        (core, state_rx)
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or the event channel is closed.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        self.spawn_poll_timer();
        self.attach_stream();
        self.publish();

        loop {
            match event_rx.recv().await {
                None => {
                    info!("PlayerCore: event channel closed, shutting down");
                    break;
                }
                Some(PlayerEvent::Shutdown) => {
                    info!("PlayerCore: shutdown requested");
                    break;
                }
                Some(evt) => {
                    self.handle_event(evt).await;
                    self.publish();
                }
            }
        }

        self.cleanup().await;
        Ok(())
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.page.clone());
    }

    async fn cleanup(&mut self) {
        self.tasks.cancel();
        // Closing the queue lets the stream task finish what was sent, then
        // shut the backends down.
        self.stream_tx = None;
        if let Some(task) = self.stream_task.take() {
            if let Err(e) = task.await {
                error!("PlayerCore: stream task failed: {}", e);
            }
        }
        info!("PlayerCore: stopped");
    }

    // ── stream attach ─────────────────────────────────────────────────────────

    /// Pick the adaptive engine, else a native sink that takes the manifest
    /// MIME type, else report that nothing can play the stream.  The page
    /// mode is set here; the attach itself runs on the stream task.
    fn attach_stream(&mut self) {
        let Some((engine, sink)) = self.backends.take() else {
            return;
        };
        let (signal_tx, mut signal_rx) = mpsc::channel::<Signal>(64);

        let tx = self.event_tx.clone();
        let token = self.tasks.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    signal = signal_rx.recv() => match signal {
                        Some(signal) => {
                            if tx.send(PlayerEvent::Signal(signal)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("PlayerCore: signal forwarder exiting");
        });

        let url = self.config.stream.manifest_url.clone();
        let route = if engine.is_supported() {
            info!("PlayerCore: attaching {} via {}", url, engine.name());
            self.page.on_adaptive_attached();
            Route::Adaptive
        } else if sink.can_play_type(&self.config.stream.native_mime) {
            info!("PlayerCore: handing {} to {}", url, sink.name());
            self.page.on_native_attached(&url);
            Route::Native
        } else {
            self.page.on_unsupported();
            Route::Unsupported
        };

        let (stream_tx, stream_rx) = mpsc::channel(16);
        self.stream_tx = Some(stream_tx);
        self.stream_task = Some(tokio::spawn(run_stream(
            StreamTask {
                engine,
                sink,
                route,
                url,
                options: self.config.engine.clone(),
                volume: self.config.player.volume,
                signals: signal_tx,
                events: self.event_tx.clone(),
                cancel: self.tasks.child_token(),
            },
            stream_rx,
        )));
    }

    // ── event dispatch ────────────────────────────────────────────────────────

    async fn handle_event(&mut self, evt: PlayerEvent) {
        match evt {
            PlayerEvent::ClientCommand(cmd) => {
                info!("PlayerCore: command {:?}", cmd);
                self.handle_command(cmd).await;
            }
            PlayerEvent::Signal(Signal::Media(signal)) => {
                debug!("PlayerCore: media {:?}", signal);
                self.page.on_media(signal);
            }
            PlayerEvent::Signal(Signal::Stream(signal)) => {
                self.page.on_stream(signal);
            }
            PlayerEvent::PollTick => self.poll_metadata(),
            PlayerEvent::MetadataFetched(result) => {
                match result {
                    Ok(payload) => {
                        let effects = self
                            .page
                            .on_metadata(&payload, &self.config.metadata.album_suffix);
                        self.apply(effects);
                    }
                    Err(e) => self.page.on_metadata_failed(&e),
                }
            }
            PlayerEvent::RatingsLoaded { track, result } => {
                self.page.on_ratings_loaded(&track, result);
            }
            PlayerEvent::RateFinished { track, outcome } => {
                let effects = self.page.on_rate_finished(&track, outcome);
                self.apply(effects);
            }
            PlayerEvent::CoverLoaded { seq, result } => {
                self.page.on_cover_loaded(seq, result);
            }
            PlayerEvent::ClearMessage => self.page.clear_message(),
            PlayerEvent::AttachFailed(details) => match self.page.attach {
                AttachMode::Native => self.page.on_media(MediaSignal::Error(details)),
                _ => self.page.on_stream(StreamSignal::Error {
                    details,
                    fatal: true,
                }),
            },
            PlayerEvent::Shutdown => {}
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Rate { vote } => self.rate(vote),
            Command::RefreshMetadata => self.poll_metadata(),
            Command::TogglePause => match self.page.attach {
                AttachMode::Adaptive => {
                    self.send_stream(StreamCommand::SetPaused(!self.page.paused));
                }
                AttachMode::Native => {
                    warn!("PlayerCore: the native sink cannot pause a live source");
                }
                AttachMode::Pending | AttachMode::Unsupported => {}
            },
        }
    }

    fn send_stream(&self, cmd: StreamCommand) {
        let Some(stream_tx) = &self.stream_tx else {
            return;
        };
        if let Err(e) = stream_tx.try_send(cmd) {
            warn!("PlayerCore: dropping {:?}: {}", cmd, e);
        }
    }

    fn rate(&mut self, vote: Vote) {
        let effects = self.page.rate(vote);
        if effects.is_empty() {
            debug!("PlayerCore: vote {:?} ignored", vote);
        }
        self.apply(effects);
    }

    // ── effects ───────────────────────────────────────────────────────────────

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LoadRatings(track) => self.load_ratings(track),
                Effect::LoadCover { seq } => self.load_cover(seq),
                Effect::SubmitRating { track, request } => {
                    let api = self.api.clone();
                    self.spawn_scoped(self.tasks.child_token(), async move {
                        let outcome = match api.rate(&request).await {
                            Ok(()) => RateOutcome::Accepted,
                            Err(ApiError::Status { message, .. }) => RateOutcome::Rejected(message),
                            Err(e) => RateOutcome::Unreachable(e.to_string()),
                        };
                        PlayerEvent::RateFinished { track, outcome }
                    });
                }
                Effect::ScheduleMessageClear => {
                    let delay = self.config.ratings.message_clear();
                    self.spawn_scoped(self.tasks.child_token(), async move {
                        tokio::time::sleep(delay).await;
                        PlayerEvent::ClearMessage
                    });
                }
            }
        }
    }

    /// Every tick fetches, whatever is still in flight.  Each request is
    /// bounded by `METADATA_TIMEOUT`, so a hung one ends in a failure event.
    fn poll_metadata(&mut self) {
        let api = self.api.clone();
        let url = self.config.metadata.url.clone();
        self.spawn_scoped(self.tasks.child_token(), async move {
            let result = api.fetch_metadata(&url).await.map_err(|e| e.to_string());
            PlayerEvent::MetadataFetched(result)
        });
    }

    fn load_ratings(&self, track: Track) {
        let api = self.api.clone();
        self.spawn_scoped(self.tasks.child_token(), async move {
            let result = api
                .load_ratings_for(&track)
                .await
                .map_err(|e| e.to_string());
            PlayerEvent::RatingsLoaded { track, result }
        });
    }

    fn load_cover(&mut self, seq: u64) {
        if let Some(previous) = self.cover_token.take() {
            previous.cancel();
        }
        let token = self.tasks.child_token();
        self.cover_token = Some(token.clone());

        let api = self.api.clone();
        let url = self.config.metadata.cover_url.clone();
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.spawn_scoped(token, async move {
            let result = api.fetch_cover(&url, now_ms).await.map_err(|e| e.to_string());
            PlayerEvent::CoverLoaded { seq, result }
        });
    }

    /// Run `fut` until `token` is cancelled and post its event back.
    fn spawn_scoped<F>(&self, token: CancellationToken, fut: F)
    where
        F: Future<Output = PlayerEvent> + Send + 'static,
    {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                evt = fut => {
                    let _ = tx.send(evt).await;
                }
            }
        });
    }

    /// Fire `PollTick` now and then every poll interval.
    fn spawn_poll_timer(&self) {
        let period = self.config.metadata.poll_interval();
        let tx = self.event_tx.clone();
        let token = self.tasks.child_token();
        info!("PlayerCore: polling metadata every {:?}", period);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(PlayerEvent::PollTick).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

// ── stream task ───────────────────────────────────────────────────────────────

struct StreamTask {
    engine: Box<dyn StreamEngine>,
    sink: Box<dyn MediaSink>,
    route: Route,
    url: String,
    options: EngineConfig,
    volume: f32,
    signals: SignalSender,
    events: mpsc::Sender<PlayerEvent>,
    cancel: CancellationToken,
}

/// Owns the engine and the sink: attach once, then run queued commands
/// until the queue closes.
async fn run_stream(mut task: StreamTask, mut commands: mpsc::Receiver<StreamCommand>) {
    let cancel = task.cancel.clone();
    let attach = async {
        match task.route {
            Route::Adaptive => {
                task.engine
                    .attach(&task.url, &task.options, task.volume, task.signals.clone())
                    .await
            }
            Route::Native => {
                task.sink
                    .set_source(&task.url, task.volume, task.signals.clone())
                    .await
            }
            Route::Unsupported => Ok(()),
        }
    };
    let attached = tokio::select! {
        biased;
        result = attach => Some(result),
        _ = cancel.cancelled() => None,
    };

    match attached {
        Some(Ok(())) => {
            while let Some(cmd) = commands.recv().await {
                match cmd {
                    StreamCommand::SetPaused(paused) => {
                        if let Err(e) = task.engine.set_paused(paused).await {
                            error!("PlayerCore: set_paused({}) failed: {}", paused, e);
                        }
                    }
                }
            }
        }
        Some(Err(e)) => {
            error!("PlayerCore: attach via {:?} failed: {:#}", task.route, e);
            if let Err(e) = task.events.try_send(PlayerEvent::AttachFailed(e.to_string())) {
                warn!("PlayerCore: attach failure not delivered: {}", e);
            }
        }
        None => debug!("PlayerCore: attach abandoned on shutdown"),
    }

    task.engine.shutdown().await;
    task.sink.shutdown().await;
    debug!("PlayerCore: stream task exiting");
}
