use std::fmt;

use log::{debug, info, warn};

use crate::Result;
use crate::media::PlayableSource;

/// Why the player view is showing an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The stored link could not be resolved into a playable source
    Unresolvable,
    /// The renderer failed to load a resolved source
    LoadFailed(String),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::Unresolvable => f.write_str("this link cannot be played"),
            PlaybackError::LoadFailed(reason) => write!(f, "video failed to load: {reason}"),
        }
    }
}

/// Player view states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Showing the call-to-action
    #[default]
    Idle,
    /// Source resolved, waiting for the renderer to report ready
    Loading,
    /// Renderer reported ready
    Playing,
    Error(PlaybackError),
}

/// Inputs to the playback state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Operator asked to play; `resolved` is whether the link resolved
    Play { resolved: bool },
    /// First frame decoded or frame finished loading
    Ready,
    LoadFailed(String),
    /// Fullscreen was left by something outside the app
    FullscreenExited,
    /// Operator stop/close action
    Stop,
    /// Operator acknowledged an error
    Retry,
}

impl PlaybackState {
    /// Pure transition function. Events that make no sense in the current
    /// state leave it unchanged.
    pub fn next(&self, event: &PlaybackEvent) -> PlaybackState {
        use PlaybackEvent as E;
        use PlaybackState as S;

        match (self, event) {
            (S::Idle | S::Error(_), E::Play { resolved: true }) => S::Loading,
            (S::Idle | S::Error(_), E::Play { resolved: false }) => {
                S::Error(PlaybackError::Unresolvable)
            }
            (S::Loading, E::Ready) => S::Playing,
            (S::Loading | S::Playing, E::LoadFailed(reason)) => {
                S::Error(PlaybackError::LoadFailed(reason.clone()))
            }
            (_, E::FullscreenExited) => S::Idle,
            (_, E::Stop) => S::Idle,
            (S::Error(_), E::Retry) => S::Idle,
            (state, _) => state.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing)
    }
}

/// What a rendering surface reports while a source is mounted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSignal {
    Pending,
    Ready,
    Failed(String),
    /// The surface went away without the app asking (window closed,
    /// hardware back button)
    Closed,
}

/// Something that can render a [`PlayableSource`]
pub trait RenderSurface {
    /// Start rendering the source
    fn mount(&mut self, source: &PlayableSource) -> Result<()>;

    /// Check for ready/failure/close signals
    fn poll(&mut self) -> SurfaceSignal;

    /// Stop rendering and release resources
    fn unmount(&mut self);
}

/// Platform fullscreen capability
pub trait Fullscreen {
    fn request_fullscreen(&mut self) -> Result<()>;
    fn exit_fullscreen(&mut self) -> Result<()>;
    fn is_fullscreen(&self) -> bool;
}

/// A backend that can both render and go fullscreen
pub trait PlaybackBackend: RenderSurface + Fullscreen {}

impl<T: RenderSurface + Fullscreen + ?Sized> PlaybackBackend for T {}

impl<T: RenderSurface + ?Sized> RenderSurface for Box<T> {
    fn mount(&mut self, source: &PlayableSource) -> Result<()> {
        (**self).mount(source)
    }

    fn poll(&mut self) -> SurfaceSignal {
        (**self).poll()
    }

    fn unmount(&mut self) {
        (**self).unmount()
    }
}

impl<T: Fullscreen + ?Sized> Fullscreen for Box<T> {
    fn request_fullscreen(&mut self) -> Result<()> {
        (**self).request_fullscreen()
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        (**self).exit_fullscreen()
    }

    fn is_fullscreen(&self) -> bool {
        (**self).is_fullscreen()
    }
}

/// Drives a rendering backend through the playback state machine.
pub struct PlaybackSession<B> {
    backend: B,
    state: PlaybackState,
    source: Option<PlayableSource>,
    focus_primary: bool,
}

impl<B: RenderSurface + Fullscreen> PlaybackSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: PlaybackState::Idle,
            source: None,
            focus_primary: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Source currently mounted, if any
    pub fn source(&self) -> Option<&PlayableSource> {
        self.source.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns true once after playback ended, so the caller can move focus
    /// back to the primary action control.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_primary)
    }

    fn apply(&mut self, event: PlaybackEvent) {
        let next = self.state.next(&event);
        if next != self.state {
            debug!("Playback {:?} --{:?}--> {:?}", self.state, event, next);
        }
        self.state = next;
    }

    /// Start playing a resolved source. `None` moves to the error state.
    pub fn play(&mut self, source: Option<PlayableSource>) -> &PlaybackState {
        self.apply(PlaybackEvent::Play {
            resolved: source.is_some(),
        });
        let Some(source) = source else {
            return &self.state;
        };
        if self.state != PlaybackState::Loading {
            return &self.state;
        }

        if let Err(e) = self.backend.request_fullscreen() {
            warn!("Fullscreen request denied, playing windowed: {}", e);
        }

        match self.backend.mount(&source) {
            Ok(()) => {
                info!("Playing {} source: {}", source.provider, source.url);
                self.source = Some(source);
            }
            Err(e) => {
                self.release();
                self.apply(PlaybackEvent::LoadFailed(e.to_string()));
            }
        }
        &self.state
    }

    /// Pump renderer signals into the state machine. Signals are only
    /// observed while playback is active.
    pub fn poll(&mut self) -> &PlaybackState {
        if !self.state.is_active() {
            return &self.state;
        }
        match self.backend.poll() {
            SurfaceSignal::Pending => {}
            SurfaceSignal::Ready => self.apply(PlaybackEvent::Ready),
            SurfaceSignal::Failed(reason) => {
                self.release();
                self.apply(PlaybackEvent::LoadFailed(reason));
            }
            SurfaceSignal::Closed => self.fullscreen_exited(),
        }
        &self.state
    }

    /// The platform reports fullscreen was exited outside the app's
    /// control. Treated as authoritative: playback folds back to idle and
    /// fullscreen is not re-requested.
    pub fn fullscreen_exited(&mut self) {
        info!("Fullscreen exited externally, returning to idle");
        self.backend.unmount();
        self.source = None;
        self.apply(PlaybackEvent::FullscreenExited);
        self.focus_primary = true;
    }

    /// Explicit stop/close by the operator
    pub fn stop(&mut self) {
        self.release();
        self.apply(PlaybackEvent::Stop);
        self.focus_primary = true;
    }

    /// Clear an error and return to the call-to-action
    pub fn retry(&mut self) {
        self.apply(PlaybackEvent::Retry);
    }

    fn release(&mut self) {
        if self.backend.is_fullscreen() {
            if let Err(e) = self.backend.exit_fullscreen() {
                warn!("Failed to exit fullscreen: {}", e);
            }
        }
        self.backend.unmount();
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::media::Resolver;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeBackend {
        signals: VecDeque<SurfaceSignal>,
        mounted: Option<String>,
        fullscreen: bool,
        deny_fullscreen: bool,
        fail_mount: bool,
        fullscreen_requests: usize,
        exits: usize,
    }

    impl RenderSurface for FakeBackend {
        fn mount(&mut self, source: &PlayableSource) -> Result<()> {
            if self.fail_mount {
                return Err(Error::Capability("renderer".into()));
            }
            self.mounted = Some(source.url.clone());
            Ok(())
        }

        fn poll(&mut self) -> SurfaceSignal {
            self.signals.pop_front().unwrap_or(SurfaceSignal::Pending)
        }

        fn unmount(&mut self) {
            self.mounted = None;
        }
    }

    impl Fullscreen for FakeBackend {
        fn request_fullscreen(&mut self) -> Result<()> {
            self.fullscreen_requests += 1;
            if self.deny_fullscreen {
                return Err(Error::Capability("fullscreen".into()));
            }
            self.fullscreen = true;
            Ok(())
        }

        fn exit_fullscreen(&mut self) -> Result<()> {
            self.exits += 1;
            self.fullscreen = false;
            Ok(())
        }

        fn is_fullscreen(&self) -> bool {
            self.fullscreen
        }
    }

    fn source() -> Option<PlayableSource> {
        Resolver::new("http://localhost").resolve("https://youtu.be/dQw4w9WgXcQ", true)
    }

    #[test]
    fn test_reducer_transitions() {
        let idle = PlaybackState::Idle;
        assert_eq!(idle.next(&PlaybackEvent::Play { resolved: true }), PlaybackState::Loading);
        assert_eq!(
            idle.next(&PlaybackEvent::Play { resolved: false }),
            PlaybackState::Error(PlaybackError::Unresolvable)
        );
        assert_eq!(idle.next(&PlaybackEvent::Ready), PlaybackState::Idle);
        assert_eq!(PlaybackState::Loading.next(&PlaybackEvent::Ready), PlaybackState::Playing);
        assert_eq!(
            PlaybackState::Playing.next(&PlaybackEvent::FullscreenExited),
            PlaybackState::Idle
        );
        assert_eq!(PlaybackState::Loading.next(&PlaybackEvent::Stop), PlaybackState::Idle);
        assert_eq!(
            PlaybackState::Error(PlaybackError::Unresolvable).next(&PlaybackEvent::Retry),
            PlaybackState::Idle
        );
        assert_eq!(PlaybackState::Playing.next(&PlaybackEvent::Retry), PlaybackState::Playing);
    }

    #[test]
    fn test_play_then_ready() {
        let mut session = PlaybackSession::new(FakeBackend {
            signals: VecDeque::from([SurfaceSignal::Pending, SurfaceSignal::Ready]),
            ..Default::default()
        });
        assert_eq!(session.play(source()), &PlaybackState::Loading);
        assert!(session.backend().fullscreen);
        assert!(session.backend().mounted.is_some());
        assert_eq!(session.poll(), &PlaybackState::Loading);
        assert_eq!(session.poll(), &PlaybackState::Playing);
    }

    #[test]
    fn test_unresolvable_goes_to_error_without_mounting() {
        let mut session = PlaybackSession::new(FakeBackend::default());
        assert_eq!(
            session.play(None),
            &PlaybackState::Error(PlaybackError::Unresolvable)
        );
        assert!(session.backend().mounted.is_none());
        assert_eq!(session.backend().fullscreen_requests, 0);
    }

    #[test]
    fn test_fullscreen_denied_plays_windowed() {
        let mut session = PlaybackSession::new(FakeBackend {
            deny_fullscreen: true,
            signals: VecDeque::from([SurfaceSignal::Ready]),
            ..Default::default()
        });
        assert_eq!(session.play(source()), &PlaybackState::Loading);
        assert_eq!(session.poll(), &PlaybackState::Playing);
        assert!(!session.backend().fullscreen);
    }

    #[test]
    fn test_mount_failure_is_load_error() {
        let mut session = PlaybackSession::new(FakeBackend {
            fail_mount: true,
            ..Default::default()
        });
        let state = session.play(source()).clone();
        assert!(matches!(state, PlaybackState::Error(PlaybackError::LoadFailed(_))));
        assert!(!session.backend().fullscreen);
    }

    #[test]
    fn test_external_close_is_authoritative() {
        let mut session = PlaybackSession::new(FakeBackend {
            signals: VecDeque::from([SurfaceSignal::Ready, SurfaceSignal::Closed]),
            ..Default::default()
        });
        session.play(source());
        session.poll();
        assert_eq!(session.poll(), &PlaybackState::Idle);
        assert_eq!(session.backend().fullscreen_requests, 1);
        assert!(session.source().is_none());
        assert!(session.take_focus_request());
        assert!(!session.take_focus_request());
    }

    #[test]
    fn test_stop_exits_fullscreen_and_requests_focus() {
        let mut session = PlaybackSession::new(FakeBackend::default());
        session.play(source());
        session.stop();
        assert_eq!(session.state(), &PlaybackState::Idle);
        assert_eq!(session.backend().exits, 1);
        assert!(session.backend().mounted.is_none());
        assert!(session.take_focus_request());
    }

    #[test]
    fn test_signals_ignored_when_idle() {
        let mut session = PlaybackSession::new(FakeBackend {
            signals: VecDeque::from([SurfaceSignal::Ready]),
            ..Default::default()
        });
        assert_eq!(session.poll(), &PlaybackState::Idle);
        assert_eq!(session.backend().signals.len(), 1);
    }

    #[test]
    fn test_render_failure_then_retry() {
        let mut session = PlaybackSession::new(FakeBackend {
            signals: VecDeque::from([SurfaceSignal::Failed("404".into())]),
            ..Default::default()
        });
        session.play(source());
        assert_eq!(
            session.poll(),
            &PlaybackState::Error(PlaybackError::LoadFailed("404".into()))
        );
        session.retry();
        assert_eq!(session.state(), &PlaybackState::Idle);
    }
}
