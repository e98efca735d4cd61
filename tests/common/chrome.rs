//! Headless Chrome fixture for the acceptance suite
//!
//! Resolution order for a browser endpoint:
//! 1. `PILOT_PORT` set: use that running browser.
//! 2. A Chrome binary (`PILOT_CHROME`, or a known name on `PATH`): launch it
//!    headless on a free port with a throwaway profile.
//! 3. Otherwise skip, unless `PILOT_REQUIRE_CHROME` is set, in which case the
//!    test fails.

use chaser_pilot::cdp::TargetDiscovery;
use chaser_pilot::config::Config;
use chaser_pilot::Page;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

const CANDIDATES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// A browser process owned by one test, killed on drop
pub struct HeadlessChrome {
    child: Child,
    port: u16,
    _profile: TempDir,
}

impl HeadlessChrome {
    /// Launch `binary` and wait until its debugging endpoint lists a page
    pub async fn launch(binary: &PathBuf) -> Option<Self> {
        let port = free_port()?;
        let profile = tempfile::tempdir().ok()?;

        let child = Command::new(binary)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--no-sandbox",
                "--no-first-run",
                "--no-default-browser-check",
                "--hide-scrollbars",
                "--window-size=1280,720",
                &format!("--remote-debugging-port={}", port),
                &format!("--user-data-dir={}", profile.path().display()),
                "about:blank",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;

        let chrome = Self {
            child,
            port,
            _profile: profile,
        };

        let discovery = TargetDiscovery::new("127.0.0.1", port).ok()?;
        for _ in 0..50 {
            if discovery.discover().await.is_ok() {
                return Some(chrome);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        eprintln!("{} did not expose a page target", binary.display());
        None
    }

    pub fn config(&self) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: self.port,
            ..Config::default()
        }
    }
}

impl Drop for HeadlessChrome {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> Option<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").ok()?;
    Some(listener.local_addr().ok()?.port())
}

fn chrome_binary() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PILOT_CHROME") {
        return Some(PathBuf::from(path));
    }
    let paths = std::env::var_os("PATH").unwrap_or_default();
    CANDIDATES.iter().find_map(|candidate| {
        let direct = PathBuf::from(candidate);
        if direct.is_absolute() {
            return direct.is_file().then_some(direct);
        }
        std::env::split_paths(&paths)
            .map(|dir| dir.join(candidate))
            .find(|path| path.is_file())
    })
}

fn unavailable(reason: &str) -> Option<(Page, Option<HeadlessChrome>)> {
    if std::env::var_os("PILOT_REQUIRE_CHROME").is_some() {
        panic!("PILOT_REQUIRE_CHROME is set but no browser is available: {}", reason);
    }
    eprintln!("skipping: {}", reason);
    None
}

/// A page on a real browser, plus the process backing it when launched here
pub async fn connect() -> Option<(Page, Option<HeadlessChrome>)> {
    if std::env::var_os("PILOT_PORT").is_some() {
        let config = Config::from_env().expect("invalid PILOT_* environment");
        let discovery = TargetDiscovery::new(&config.host, config.port).ok()?;
        if let Err(e) = discovery.discover().await {
            return unavailable(&format!("no debugging endpoint at {} ({})", config.endpoint(), e));
        }
        return Page::from_config(config).ok().map(|page| (page, None));
    }

    let Some(binary) = chrome_binary() else {
        return unavailable("no Chrome binary found (set PILOT_CHROME or PILOT_PORT)");
    };
    let Some(chrome) = HeadlessChrome::launch(&binary).await else {
        return unavailable(&format!("could not launch {}", binary.display()));
    };
    let page = Page::from_config(chrome.config()).ok()?;
    Some((page, Some(chrome)))
}
