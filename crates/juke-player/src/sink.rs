//! The audio-output capability the player drives, plus the production
//! adapter speaking mpv's JSON IPC protocol.
//!
//! Adapter architecture (mirrors the daemon/mpv split):
//!
//! ```text
//!   MpvSink::spawn()
//!         │
//!         ├── writer task  ← receives queued commands via mpsc,
//!         │                  serialises {command, request_id} -> socket
//!         └── reader task  ← reads JSON lines from the socket and logs
//!                            error responses (matched by request_id)
//! ```
//!
//! Sink methods enqueue and return immediately; the writer applies
//! commands strictly in submission order, which is what the fade ordering
//! invariant relies on.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use juke_core::platform;

/// Abstract audio output. Volume is normalised 0.0-1.0 at this boundary;
/// adapters rescale to whatever their backend wants. Commands are issued
/// without blocking the caller on the backend's round trip.
pub trait AudioSink: Send + Sync + 'static {
    fn load_track(&self, path: &Path) -> anyhow::Result<()>;
    fn play(&self) -> anyhow::Result<()>;
    fn pause(&self) -> anyhow::Result<()>;
    fn stop(&self) -> anyhow::Result<()>;
    fn set_volume(&self, level: f32) -> anyhow::Result<()>;
}

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

struct SinkCmd {
    req_id: u64,
    /// Serialised JSON line, newline included.
    payload: String,
    /// For log context when mpv answers with an error.
    label: &'static str,
}

/// mpv-backed sink. Cheap to clone; all clones feed the same writer task.
/// The spawned mpv process is killed when the last handle is dropped.
#[derive(Clone)]
pub struct MpvSink {
    tx: mpsc::UnboundedSender<SinkCmd>,
}

impl MpvSink {
    /// Spawn `mpv --no-video --idle=yes` with an IPC socket and connect.
    pub async fn spawn() -> anyhow::Result<Self> {
        let mpv_binary = platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        info!("mpv: spawning {}", mpv_binary.display());
        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(platform::mpv_socket_arg())
            .arg("--quiet")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        Self::connect(child).await
    }

    #[cfg(unix)]
    async fn connect(child: tokio::process::Child) -> anyhow::Result<Self> {
        let socket_path = std::path::PathBuf::from(platform::mpv_socket_path());

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
        Ok(Self::start_io_tasks(child, read_half, write_half))
    }

    #[cfg(windows)]
    async fn connect(child: tokio::process::Child) -> anyhow::Result<Self> {
        let pipe_path = format!(r"\\.\pipe\{}", platform::mpv_socket_path());

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(pipe) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(pipe);
                return Ok(Self::start_io_tasks(child, read_half, write_half));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    fn start_io_tasks<R, W>(child: tokio::process::Child, read_half: R, write_half: W) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        // req_id -> command label, so the reader can log failures usefully.
        let in_flight: Arc<Mutex<std::collections::HashMap<u64, &'static str>>> =
            Arc::new(Mutex::new(std::collections::HashMap::new()));

        let (tx, rx) = mpsc::unbounded_channel::<SinkCmd>();

        tokio::spawn(writer_task(child, write_half, rx, in_flight.clone()));
        tokio::spawn(reader_task(BufReader::new(read_half), in_flight));

        Self { tx }
    }

    fn send(&self, label: &'static str, command: Value) -> anyhow::Result<()> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut payload = serde_json::to_string(&msg)?;
        payload.push('\n');

        self.tx
            .send(SinkCmd {
                req_id,
                payload,
                label,
            })
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))
    }
}

impl AudioSink for MpvSink {
    fn load_track(&self, path: &Path) -> anyhow::Result<()> {
        self.send("loadfile", json!(["loadfile", path.to_string_lossy()]))
    }

    fn play(&self) -> anyhow::Result<()> {
        self.send("play", json!(["set_property", "pause", false]))
    }

    fn pause(&self) -> anyhow::Result<()> {
        self.send("pause", json!(["set_property", "pause", true]))
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.send("stop", json!(["stop"]))
    }

    fn set_volume(&self, level: f32) -> anyhow::Result<()> {
        // mpv volume is percent.
        let pct = (level * 100.0).clamp(0.0, 100.0);
        self.send("volume", json!(["set_property", "volume", pct]))
    }
}

async fn writer_task<W>(
    mut child: tokio::process::Child,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<SinkCmd>,
    in_flight: Arc<Mutex<std::collections::HashMap<u64, &'static str>>>,
) where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(cmd) = rx.recv().await {
        if let Ok(mut map) = in_flight.lock() {
            map.insert(cmd.req_id, cmd.label);
        }
        debug!("mpv writer: req={} {}", cmd.req_id, cmd.payload.trim());
        if let Err(e) = writer.write_all(cmd.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            break;
        }
    }

    // All sink handles dropped (or the socket died): take mpv down with us.
    debug!("mpv writer: task exiting, killing mpv");
    let _ = child.kill().await;
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    in_flight: Arc<Mutex<std::collections::HashMap<u64, &'static str>>>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
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

                let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) else {
                    // Unsolicited event; nothing in the sink contract needs these.
                    continue;
                };

                let label = in_flight
                    .lock()
                    .ok()
                    .and_then(|mut m| m.remove(&req_id))
                    .unwrap_or("?");

                match val["error"].as_str() {
                    Some("success") => debug!("mpv reader: {} req={} ok", label, req_id),
                    other => warn!(
                        "mpv reader: {} req={} failed: {}",
                        label,
                        req_id,
                        other.unwrap_or("unknown error")
                    ),
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                break;
            }
        }
    }
}
