use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use signage_core::config::PlayerConfig;
use signage_core::{Error, Fullscreen, PlayableSource, RenderSurface, Result, SurfaceSignal};

/// Renders sources in an external media player process (mpv by default).
///
/// The player counts as ready once it has stayed up for the grace period.
/// Exiting before that with a failure status is a load error; any other
/// exit means the operator closed the player window.
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
    grace: Duration,
    allow_fullscreen: bool,
    fullscreen: bool,
    child: Option<Child>,
    started: Option<Instant>,
    ready: bool,
}

impl ExternalPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            grace: Duration::from_millis(config.ready_grace_ms),
            allow_fullscreen: config.fullscreen,
            fullscreen: false,
            child: None,
            started: None,
            ready: false,
        }
    }

    /// Check that the player executable can be launched
    pub fn is_available(&self) -> bool {
        match Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("{} --version failed: {}", self.command, e);
                false
            }
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn build_command(&self, source: &PlayableSource) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if self.fullscreen {
            cmd.arg("--fs");
        }
        if source.looping {
            cmd.arg("--loop-file=inf");
        }
        cmd.arg(&source.url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl RenderSurface for ExternalPlayer {
    fn mount(&mut self, source: &PlayableSource) -> Result<()> {
        self.unmount();
        let child = self.build_command(source).spawn().map_err(|e| {
            warn!("Failed to launch {}: {}", self.command, e);
            Error::Capability(format!("media player '{}'", self.command))
        })?;
        info!("Launched {} (pid {})", self.command, child.id());
        self.child = Some(child);
        self.started = Some(Instant::now());
        self.ready = false;
        Ok(())
    }

    fn poll(&mut self) -> SurfaceSignal {
        let Some(child) = self.child.as_mut() else {
            return SurfaceSignal::Closed;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                if !self.ready && !status.success() {
                    SurfaceSignal::Failed(format!("{} exited with {}", self.command, status))
                } else {
                    debug!("{} exited with {}", self.command, status);
                    SurfaceSignal::Closed
                }
            }
            Ok(None) => {
                let up_for = self.started.map(|t| t.elapsed()).unwrap_or_default();
                if !self.ready && up_for >= self.grace {
                    self.ready = true;
                    SurfaceSignal::Ready
                } else {
                    SurfaceSignal::Pending
                }
            }
            Err(e) => SurfaceSignal::Failed(e.to_string()),
        }
    }

    fn unmount(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!("Player already gone: {}", e);
            }
            let _ = child.wait();
        }
        self.started = None;
        self.ready = false;
    }
}

impl Fullscreen for ExternalPlayer {
    fn request_fullscreen(&mut self) -> Result<()> {
        if !self.allow_fullscreen {
            return Err(Error::Capability("fullscreen".to_string()));
        }
        self.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.fullscreen = false;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.unmount();
    }
}
