pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod store;

// Re-exports
pub use config::{Backend, SignageConfig};
pub use error::{Error, Result};
pub use media::{
    PlayableSource, RenderKind, Resolver, VideoProvider, classify, is_valid_video_link,
};
pub use playback::{
    Fullscreen, PlaybackBackend, PlaybackError, PlaybackEvent, PlaybackSession, PlaybackState, RenderSurface,
    SurfaceSignal,
};
pub use store::{LocalStore, RemoteStore, Settings, VideoDraft, VideoRecord, VideoStore};

/// Open the store selected by the configuration
pub fn open_store(config: &SignageConfig) -> Result<Box<dyn VideoStore>> {
    config.validate()?;
    match config.backend {
        Backend::Local => Ok(Box::new(LocalStore::open(config.local_store_path()?)?)),
        Backend::Remote => Ok(Box::new(RemoteStore::from_config(config)?)),
    }
}
