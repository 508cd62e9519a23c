use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether to use system-installed binaries from PATH instead of bundled
/// ones beside the executable.
static USE_SYSTEM_DEPS: AtomicBool = AtomicBool::new(false);

pub fn set_use_system_deps(use_system: bool) {
    USE_SYSTEM_DEPS.store(use_system, Ordering::Relaxed);
}

pub fn should_use_system_deps() -> bool {
    USE_SYSTEM_DEPS.load(Ordering::Relaxed)
}

#[cfg(unix)]
pub fn mpv_socket_name() -> String {
    format!(
        "{}/calico-mpv-{}.sock",
        std::env::temp_dir().display(),
        std::process::id()
    )
}

#[cfg(windows)]
pub fn mpv_socket_name() -> String {
    format!("calico-mpv-{}", std::process::id())
}

#[cfg(unix)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server={}", socket_name)
}

#[cfg(windows)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", socket_name)
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/calico on macOS too, for consistency with Linux
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("calico")
    }
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_data = exe_dir.join("data");
                if portable_data.exists() {
                    return portable_data;
                }
            }
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calico")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                if exe_dir.join("config.toml").exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("calico")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calico")
    }
}

#[cfg(unix)]
fn mpv_binary_names() -> &'static [&'static str] {
    &["mpv"]
}

#[cfg(windows)]
fn mpv_binary_names() -> &'static [&'static str] {
    &["mpv.exe", "mpv"]
}

#[cfg(unix)]
fn ffplay_binary_names() -> &'static [&'static str] {
    &["ffplay"]
}

#[cfg(windows)]
fn ffplay_binary_names() -> &'static [&'static str] {
    &["ffplay.exe", "ffplay"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

fn find_binary(names: &[&str]) -> Option<PathBuf> {
    if !should_use_system_deps() {
        if let Some(p) = find_beside_exe(names) {
            return Some(p);
        }
    }
    find_on_path(names)
}

/// Find the mpv binary that backs the adaptive-streaming engine.
pub fn find_mpv_binary() -> Option<PathBuf> {
    find_binary(mpv_binary_names())
}

/// Find ffplay, the native HLS sink used when mpv is unavailable.
pub fn find_ffplay_binary() -> Option<PathBuf> {
    find_binary(ffplay_binary_names())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn socket_is_per_process_in_temp_dir() {
        let name = mpv_socket_name();
        assert!(name.ends_with(&format!("calico-mpv-{}.sock", std::process::id())));
        assert_eq!(mpv_socket_arg("/tmp/x.sock"), "--input-ipc-server=/tmp/x.sock");
    }

    #[test]
    fn missing_binaries_are_not_found() {
        assert_eq!(find_binary(&["calico-no-such-binary-3f9a"]), None);
    }
}
