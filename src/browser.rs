// src/browser.rs
use log::{error, info, warn};
use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;

/// Opens a link somewhere outside the terminal.
pub trait LinkOpener: Send {
    fn open_link(&mut self, url: &str) -> io::Result<()>;
}

/// Which launcher the current platform uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launcher {
    CmdStart,
    Open,
    XdgOpen,
}

impl Launcher {
    fn current() -> Self {
        if cfg!(target_os = "windows") {
            Launcher::CmdStart
        } else if cfg!(target_os = "macos") {
            Launcher::Open
        } else {
            Launcher::XdgOpen
        }
    }

    fn command_line(self, url: &str) -> (&'static str, Vec<String>) {
        match self {
            // Empty title argument so `start` does not treat the URL as one.
            Launcher::CmdStart => {
                ("cmd", vec!["/C".into(), "start".into(), String::new(), escape_for_cmd(url)])
            }
            Launcher::Open => ("open", vec![url.to_string()]),
            Launcher::XdgOpen => ("xdg-open", vec![url.to_string()]),
        }
    }
}

/// Caret-escapes the characters cmd.exe treats as operators, so a query
/// string like `?a=1&b=2` reaches `start` whole. Spaces and quotes are
/// percent-encoded to keep the argument unquoted.
fn escape_for_cmd(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '^' | '&' | '|' | '<' | '>' | '(' | ')' => {
                escaped.push('^');
                escaped.push(c);
            }
            ' ' => escaped.push_str("%20"),
            '"' => escaped.push_str("%22"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Starts `cmd` and waits for it on a background thread so the finished
/// launcher does not linger as a zombie.
fn spawn_reaped(mut cmd: Command) -> io::Result<thread::JoinHandle<()>> {
    let mut child: Child =
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => warn!("SystemBrowser: launcher exited with {}", status),
        Ok(_) => {}
        Err(e) => warn!("SystemBrowser: could not wait for launcher: {}", e),
    }))
}

/// Hands the URL to the platform's default browser.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(launcher: Launcher, url: &str) -> Command {
        let (program, args) = launcher.command_line(url);
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

impl LinkOpener for SystemBrowser {
    fn open_link(&mut self, url: &str) -> io::Result<()> {
        info!("SystemBrowser: opening {}", url);
        // Launcher output would scribble over the alternate screen, so all
        // three streams are null.
        spawn_reaped(Self::command(Launcher::current(), url))
            .map(|_reaper| ())
            .inspect_err(|e| error!("SystemBrowser: failed to open {}: {}", url, e))
    }
}

/// Remembers what it was asked to open. For tests.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

impl LinkOpener for std::sync::Arc<RecordingOpener> {
    fn open_link(&mut self, url: &str) -> io::Result<()> {
        if let Ok(mut urls) = self.opened.lock() {
            urls.push(url.to_string());
        }
        Ok(())
    }
}
