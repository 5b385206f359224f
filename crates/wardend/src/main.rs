//! wardend - session gate and moderation service
//!
//! Wires together configuration, the record store, the session engine,
//! and the IPC server, then runs a single control loop that serializes
//! every state change: IPC requests, deadline ticks, and shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use warden_config::{load_config, Policy, StorageBackend};
use warden_core::{AuthError, LoginOutcome, MuteOutcome, SessionEngine, Sha256Hasher};
use warden_store::{JsonDirBackend, RecordBackend, RecordStore, SqliteBackend};
use warden_util::{default_config_path, format_duration, MonotonicInstant};

use wardend::ipc::{IpcServer, ServerMessage};
use wardend::proto::{Command, ErrorCode, ErrorInfo, Event, Response, ResponsePayload};

/// wardend - session gate and moderation state service for game servers
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Session gate and moderation state service for game servers", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/wardend/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set WARDEN_SOCKET env var)
    #[arg(short, long, env = "WARDEN_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set WARDEN_DATA_DIR env var)
    #[arg(short, long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

struct Service {
    engine: SessionEngine,
    ipc: Arc<IpcServer>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let policy = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            info!(config_path = %args.config.display(), "No config file, using defaults");
            Policy::default()
        };

        info!(
            login_deadline = %format_duration(policy.auth.login_deadline),
            escalation_threshold = policy.auth.escalation.threshold,
            "Policy loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.storage.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let backend: Arc<dyn RecordBackend> = match policy.storage.backend {
            StorageBackend::Json => Arc::new(
                JsonDirBackend::open(&data_dir)
                    .with_context(|| format!("Failed to open record directory {:?}", data_dir))?,
            ),
            StorageBackend::Sqlite => {
                let db_path = data_dir.join("wardend.db");
                Arc::new(
                    SqliteBackend::open(&db_path)
                        .with_context(|| format!("Failed to open database {:?}", db_path))?,
                )
            }
        };

        if !backend.is_healthy() {
            anyhow::bail!("Storage backend failed its health check in {:?}", data_dir);
        }

        let store = Arc::new(RecordStore::new(backend));
        let loaded = store.load_all();
        info!(
            data_dir = %data_dir.display(),
            backend = ?policy.storage.backend,
            loaded,
            "Record store initialized"
        );

        let engine = SessionEngine::new(policy, store, Arc::new(Sha256Hasher));

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        Ok(Self {
            engine,
            ipc: Arc::new(ipc),
        })
    }

    async fn run(mut self) -> Result<()> {
        let ipc = self.ipc.clone();
        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("Message receiver already taken")?;

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                warn!(error = %e, "IPC server exited");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut tick_timer = tokio::time::interval(Duration::from_millis(250));

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // deadline expiry
                _ = tick_timer.tick() => {
                    let events = self.engine.tick(MonotonicInstant::now());
                    for event in events {
                        self.ipc.broadcast_event(Event::new(event));
                    }
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        self.engine.shutdown();
        self.ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let response = self.handle_command(request.request_id, request.command);
                let _ = self.ipc.send_response(&client_id, response).await;
            }
            ServerMessage::ClientConnected { client_id } => {
                debug!(client_id = %client_id, "IPC client connected");
            }
            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "IPC client disconnected");
            }
        }
    }

    fn handle_command(&mut self, request_id: u64, command: Command) -> Response {
        let now = warden_util::now();
        let now_mono = MonotonicInstant::now();

        match command {
            Command::Connect {
                player_id,
                display_name,
            } => match self.engine.connect(player_id, &display_name, now, now_mono) {
                Ok(state) => Response::success(request_id, ResponsePayload::Connected { state }),
                Err(err) => Response::error(request_id, ErrorInfo::from(&err)),
            },

            Command::Disconnect { player_id } => {
                let was_connected = self.engine.disconnect(player_id);
                Response::success(request_id, ResponsePayload::Disconnected { was_connected })
            }

            Command::Register {
                player_id,
                password,
                confirm,
            } => match self.engine.register(player_id, &password, &confirm) {
                Ok(()) => Response::success(request_id, ResponsePayload::Registered),
                Err(err) => Response::error(request_id, ErrorInfo::from(&err)),
            },

            Command::Login {
                player_id,
                password,
            } => match self.engine.login(player_id, &password, now) {
                Ok(outcome) => Response::success(
                    request_id,
                    ResponsePayload::LoggedIn {
                        already: outcome == LoginOutcome::AlreadyLoggedIn,
                    },
                ),
                Err(err) => {
                    // an escalation ban removes the session; tell the
                    // host to drop the connection too
                    if let AuthError::Banned { minutes, reason, .. } = &err {
                        let display_name = self
                            .engine
                            .moderation_status(player_id, now)
                            .map(|s| s.display_name)
                            .unwrap_or_default();
                        self.ipc.broadcast_event(Event::new(warden_core::EngineEvent::Kick {
                            player_id,
                            display_name,
                            reason: warden_core::KickReason::Banned {
                                minutes: *minutes,
                                reason: reason.clone(),
                            },
                        }));
                    }
                    Response::error(request_id, ErrorInfo::from(&err))
                }
            },

            Command::IsAuthenticated { player_id } => Response::success(
                request_id,
                ResponsePayload::Authenticated {
                    authenticated: self.engine.is_authenticated(player_id),
                },
            ),

            Command::Status { player_id } => match self.engine.moderation_status(player_id, now) {
                Some(status) => Response::success(request_id, ResponsePayload::Status(status)),
                None => Self::unknown_player(request_id),
            },

            Command::Ban {
                player_id,
                minutes,
                reason,
            } => match self.engine.apply_ban(player_id, minutes, reason, now) {
                Some((status, event)) => {
                    if let Some(event) = event {
                        self.ipc.broadcast_event(Event::new(event));
                    }
                    Response::success(request_id, ResponsePayload::Moderated(status))
                }
                None => Self::unknown_player(request_id),
            },

            Command::Unban { player_id } => match self.engine.clear_ban(player_id, now) {
                Some(status) => Response::success(request_id, ResponsePayload::Moderated(status)),
                None => Self::unknown_player(request_id),
            },

            Command::Mute { player_id, minutes } => {
                let minutes =
                    minutes.unwrap_or(self.engine.policy().moderation.default_mute_minutes);
                match self.engine.apply_mute(player_id, minutes, now) {
                    Some(MuteOutcome::Applied(status)) => {
                        Response::success(request_id, ResponsePayload::Moderated(status))
                    }
                    Some(MuteOutcome::AlreadyMuted(_)) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::AlreadyMuted, "Player is already muted"),
                    ),
                    None => Self::unknown_player(request_id),
                }
            }

            Command::Unmute { player_id } => match self.engine.clear_mute(player_id, now) {
                Some(status) => Response::success(request_id, ResponsePayload::Moderated(status)),
                None => Self::unknown_player(request_id),
            },

            Command::Warn { player_id } => match self.engine.add_warn(player_id, now) {
                Some(status) => Response::success(request_id, ResponsePayload::Moderated(status)),
                None => Self::unknown_player(request_id),
            },

            Command::Unwarn { player_id } => match self.engine.remove_warn(player_id, now) {
                Some(status) => Response::success(request_id, ResponsePayload::Moderated(status)),
                None => Self::unknown_player(request_id),
            },

            Command::Kick { player_id, reason } => match self.engine.kick(player_id, reason) {
                Some(event) => {
                    self.ipc.broadcast_event(Event::new(event));
                    Response::success(request_id, ResponsePayload::Kicked)
                }
                None => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::NotConnected, "Player is not connected"),
                ),
            },

            Command::PurgeRecord { player_id } => {
                match self.engine.purge_record(player_id, now) {
                    Some(events) => {
                        for event in events {
                            self.ipc.broadcast_event(Event::new(event));
                        }
                        Response::success(request_id, ResponsePayload::Purged)
                    }
                    None => Self::unknown_player(request_id),
                }
            }

            Command::SubscribeEvents => {
                // the reader task already flagged this connection
                Response::success(request_id, ResponsePayload::Subscribed)
            }

            Command::RecentAudits { limit } => {
                let audits = self.engine.recent_audits(limit);
                Response::success(request_id, ResponsePayload::Audits(audits))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    fn unknown_player(request_id: u64) -> Response {
        Response::error(
            request_id,
            ErrorInfo::new(ErrorCode::UnknownPlayer, "No record for this identity"),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "wardend starting");

    let service = Service::new(&args).await?;
    service.run().await
}
