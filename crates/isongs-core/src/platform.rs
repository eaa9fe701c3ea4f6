use std::path::{Path, PathBuf};

/// Compiled recognition script looked up beside the executable.
pub const COMPILED_SCRIPT_NAME: &str = "streamTitle.scpt";
/// Source form of the recognition script, used when no compiled one exists.
pub const SOURCE_SCRIPT_NAME: &str = "streamTitle.applescript";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/isongs/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("isongs")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("isongs")
    }
}

pub fn config_dir() -> PathBuf {
    // On Windows, check for portable config.toml in executable directory first
    #[cfg(windows)]
    {
        if let Some(dir) = exe_dir() {
            if dir.join("config.toml").exists() {
                return dir;
            }
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("isongs")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("isongs")
    }
}

fn exe_dir() -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    current_exe.parent().map(Path::to_path_buf)
}

fn find_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let p = dir.join(name);
    if p.exists() {
        return Some(p);
    }
    let p = dir.join("external").join(name);
    if p.exists() {
        return Some(p);
    }
    None
}

/// Find the recognition script when none is configured explicitly.
/// Checks: compiled script beside the exe, source script beside the exe,
/// then the source script in the config directory.
pub fn find_recognition_script() -> Option<PathBuf> {
    if let Some(dir) = exe_dir() {
        if let Some(p) = find_in(&dir, COMPILED_SCRIPT_NAME) {
            return Some(p);
        }
        if let Some(p) = find_in(&dir, SOURCE_SCRIPT_NAME) {
            return Some(p);
        }
    }

    let p = config_dir().join(SOURCE_SCRIPT_NAME);
    if p.exists() {
        return Some(p);
    }

    None
}
