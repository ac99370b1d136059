//! Reading and rewriting VLC's own `vlcrc` for the HTTP interface settings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;

use crate::error::CoreError;

const GENERATED_PASSWORD_LEN: usize = 12;

static RE_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^http-password=(.+)$").unwrap());
static RE_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^http-port=(\d+)").unwrap());
static RE_EXTRAINTF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^extraintf=(.*)$").unwrap());

/// HTTP interface settings found in a vlcrc. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlcSettings {
    pub http_port: Option<u16>,
    pub http_password: Option<String>,
    pub http_enabled: Option<bool>,
}

/// Outcome of [`configure_vlc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlcSetup {
    pub path: PathBuf,
    pub port: u16,
    /// The password written, including a generated one.
    pub password: Option<String>,
    pub http_enabled: bool,
}

/// Platform location of VLC's config file.
pub fn default_vlcrc_path() -> Option<PathBuf> {
    let base = directories::BaseDirs::new()?;
    let path = if cfg!(target_os = "windows") {
        base.config_dir().join("vlc").join("vlcrc")
    } else if cfg!(target_os = "macos") {
        base.home_dir()
            .join("Library")
            .join("Preferences")
            .join("org.videolan.vlc")
            .join("vlcrc")
    } else {
        base.home_dir().join(".config").join("vlc").join("vlcrc")
    };
    Some(path)
}

pub fn parse_vlcrc(content: &str) -> VlcSettings {
    let capture = |re: &Regex| {
        re.captures(content)
            .map(|c| c[1].trim().to_string())
    };
    VlcSettings {
        http_port: capture(&RE_PORT).and_then(|p| p.parse().ok()),
        http_password: capture(&RE_PASSWORD).filter(|p| !p.is_empty()),
        http_enabled: capture(&RE_EXTRAINTF).map(|v| v.contains("http")),
    }
}

/// Read settings from a vlcrc; a missing file is not an error.
pub fn read_vlcrc(path: &Path) -> Result<Option<VlcSettings>, CoreError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "VLC config file not found");
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    tracing::info!(path = %path.display(), "Found VLC config file");
    Ok(Some(parse_vlcrc(&content)))
}

/// Enable (or disable) VLC's HTTP interface in the given vlcrc.
///
/// A password is generated when HTTP is enabled and none is given.
pub fn configure_vlc(
    path: &Path,
    port: u16,
    enable_http: bool,
    password: Option<String>,
) -> Result<VlcSetup, CoreError> {
    let password = match password {
        Some(p) if !p.is_empty() => Some(p),
        _ if enable_http => {
            tracing::info!("Generated random HTTP password for VLC");
            Some(generate_password())
        }
        _ => None,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        rewrite(&existing, port, enable_http, password.as_deref())
    } else {
        let mut fresh = String::from("[main]\n");
        fresh.push_str(&format!("http-port={port}\n"));
        if enable_http {
            fresh.push_str("extraintf=http\n");
            if let Some(p) = &password {
                fresh.push_str(&format!("http-password={p}\n"));
            }
        }
        fresh
    };

    std::fs::write(path, content)
        .map_err(|e| CoreError::Vlcrc(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), port, enable_http, "VLC configuration updated");

    Ok(VlcSetup {
        path: path.to_path_buf(),
        port,
        password,
        http_enabled: enable_http,
    })
}

fn rewrite(existing: &str, port: u16, enable_http: bool, password: Option<&str>) -> String {
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    let port_line = format!("http-port={port}");

    match lines.iter().position(|l| l.starts_with("http-port=")) {
        Some(i) => lines[i] = port_line,
        None => insert_near_http(&mut lines, port_line, |_| false),
    }

    if let Some(password) = password {
        let password_line = format!("http-password={password}");
        let existing_line = lines
            .iter()
            .position(|l| l.starts_with("http-password=") || l.starts_with("#http-password="));
        match existing_line {
            Some(i) => lines[i] = password_line,
            None => insert_near_http(&mut lines, password_line, |l| l.contains("http-port")),
        }
    }

    if enable_http {
        match lines.iter().position(|l| l.starts_with("extraintf=")) {
            Some(i) => {
                let value = lines[i]["extraintf=".len()..].trim().to_string();
                if !value.contains("http") {
                    lines[i] = if value.is_empty() {
                        "extraintf=http".to_string()
                    } else {
                        format!("extraintf={value},http")
                    };
                }
            }
            None => lines.push("extraintf=http".to_string()),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Insert after the first line matching `preferred`, else after the first
/// `http-` line, else at the end.
fn insert_near_http(lines: &mut Vec<String>, line: String, preferred: impl Fn(&str) -> bool) {
    let at = lines
        .iter()
        .position(|l| preferred(l))
        .or_else(|| lines.iter().position(|l| l.contains("http-")));
    match at {
        Some(i) => lines.insert(i + 1, line),
        None => lines.push(line),
    }
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
