//! Browser Launch

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Platform command that opens `url` in the default browser
pub fn opener_command(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// Open `url` without waiting for the browser.
///
/// The opener is reaped on a blocking task so it never lingers as a zombie.
pub fn open(url: &str) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    launch(opener_command(url))
}

fn launch(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;

    Ok(tokio::task::spawn_blocking(move || {
        let status = child.wait();
        match &status {
            Ok(status) if !status.success() => warn!("Browser opener exited with {}", status),
            Ok(_) => debug!("Browser opener finished"),
            Err(e) => warn!("Could not wait for browser opener: {}", e),
        }
        status
    }))
}

/// Open `url`, logging instead of failing
pub fn open_or_warn(url: &str) {
    match open(url) {
        Ok(_) => info!("Opened {} in the default browser", url),
        Err(e) => warn!("Could not open a browser for {}: {}", url, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opener_passes_url() {
        let command = opener_command("http://localhost:8080");
        let args: Vec<_> = command.get_args().collect();
        assert!(args.iter().any(|a| *a == "http://localhost:8080"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launched_process_is_reaped() {
        let handle = launch(Command::new("true")).unwrap();
        let status = handle.await.unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_missing_opener_is_an_error() {
        let result = launch(Command::new("/nonexistent/toolshop-opener"));
        assert!(result.is_err());
    }
}
