//! Platform paths and external binary discovery.

use std::path::PathBuf;

pub fn config_dir() -> PathBuf {
    // ~/.config/juke on unix (XDG, avoiding macOS Application Support for
    // consistency), the platform config dir elsewhere.
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("juke")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("juke")
    }
}

/// Default root for acquired playlists: `<music dir>/juke`.
pub fn default_playlists_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("juke")
}

#[cfg(unix)]
pub fn mpv_socket_path() -> String {
    format!("{}/juke-mpv.sock", std::env::temp_dir().display())
}

#[cfg(windows)]
pub fn mpv_socket_path() -> String {
    "juke-mpv".to_string()
}

#[cfg(unix)]
pub fn mpv_socket_arg() -> String {
    format!("--input-ipc-server={}", mpv_socket_path())
}

#[cfg(windows)]
pub fn mpv_socket_arg() -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", mpv_socket_path())
}

#[cfg(unix)]
fn binary_names(base: &'static str) -> Vec<String> {
    vec![base.to_string()]
}

#[cfg(windows)]
fn binary_names(base: &'static str) -> Vec<String> {
    vec![format!("{base}.exe"), base.to_string()]
}

fn find_beside_exe(names: &[String]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ':';
    #[cfg(windows)]
    let sep = ';';
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

fn find_binary(env_override: &str, base: &'static str) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(env_override) {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    let names = binary_names(base);
    find_beside_exe(&names).or_else(|| find_on_path(&names))
}

/// Find yt-dlp: `YT_DLP_PATH` env var, beside the current exe, then PATH.
pub fn find_yt_dlp_binary() -> Option<PathBuf> {
    find_binary("YT_DLP_PATH", "yt-dlp")
}

/// Find ffmpeg: `FFMPEG_PATH` env var, beside the current exe, then PATH.
pub fn find_ffmpeg_binary() -> Option<PathBuf> {
    find_binary("FFMPEG_PATH", "ffmpeg")
}

/// Find mpv: `MPV_PATH` env var, beside the current exe, then PATH.
pub fn find_mpv_binary() -> Option<PathBuf> {
    find_binary("MPV_PATH", "mpv")
}
