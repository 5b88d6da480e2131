//! Playback controller — session state machine over the catalog and pipeline.
//!
//! Transitions (every command is rejected while an open is in flight):
//!
//! | Command | From | To |
//! |---------|------|----|
//! | `Play` | `Paused`, or any with a current track | `Playing` |
//! | `Pause` | `Playing` | `Paused` |
//! | `Stop` | any | `Stopped` |
//! | `NextTrack` / `PrevTrack` / `PlayTrack(i)` | any | `Playing` once the open succeeds |
//!
//! The busy flag and the state are mirrored in atomics so the transport's
//! real-time pull can read them without taking a lock. The catalog and the
//! pipeline both do card I/O, so both sit behind async mutexes: the control
//! side awaits them, the pull only ever `try_lock`s the pipeline. Blocking
//! mutexes guard only the small in-memory session and observer list.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use heapless::Vec;
use library::track::{name_from_path, TrackMetadata, TrackName};
use library::CatalogIndex;
use platform::config::{PlayerConfig, MAX_OBSERVERS};
use platform::storage::Storage;

use crate::decoder::StreamDecoder;
use crate::pipeline::{AudioPipeline, PipelineError};

/// Current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackState {
    /// Nothing is being delivered.
    Stopped = 0,
    /// The pull delivers the current track.
    Playing = 1,
    /// The current track is held; the pull delivers silence.
    Paused = 2,
}

impl PlaybackState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Playing,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// A user or transport command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Start or resume.
    Play,
    /// Hold the current track.
    Pause,
    /// Stop delivering audio.
    Stop,
    /// Open the next ordinal, wrapping to 0.
    NextTrack,
    /// Open the previous ordinal, wrapping to the last.
    PrevTrack,
    /// Open this ordinal.
    PlayTrack(u32),
}

/// Why a command was rejected. The session is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A track open is in flight.
    #[error("controller busy")]
    Busy,
    /// The ordinal is outside the catalog, or its file is gone.
    #[error("track not found")]
    NotFound,
    /// The track file is empty.
    #[error("track is empty")]
    Empty,
    /// The decoder refused the track.
    #[error("decoder could not start")]
    DecoderInit,
    /// Storage failure while opening.
    #[error("storage I/O error")]
    Io,
    /// `Play` with no current track.
    #[error("no current track")]
    NoCurrentTrack,
    /// The command does not apply in the current state.
    #[error("invalid transition")]
    InvalidTransition,
}

impl From<PipelineError> for CommandError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound => Self::NotFound,
            PipelineError::Empty => Self::Empty,
            PipelineError::DecoderInit => Self::DecoderInit,
            PipelineError::Io => Self::Io,
        }
    }
}

/// Receives every state-affecting transition.
///
/// Called from the control context with the session already updated.
pub trait PlaybackObserver {
    /// `ordinal` is `None` until a track has been opened.
    fn on_playback_changed(&self, state: PlaybackState, ordinal: Option<u32>, name: &str);
}

#[derive(Default)]
struct Session {
    current: Option<u32>,
    name: TrackName,
    metadata: TrackMetadata,
}

/// Session state machine driving the catalog and the audio pipeline.
pub struct PlaybackController<'a, M: RawMutex, S: Storage, D: StreamDecoder> {
    catalog: Mutex<M, CatalogIndex<S>>,
    pipeline: Mutex<M, AudioPipeline<S, D>>,
    session: BlockingMutex<M, RefCell<Session>>,
    observers: BlockingMutex<M, RefCell<Vec<&'a dyn PlaybackObserver, MAX_OBSERVERS>>>,
    busy: AtomicBool,
    state: AtomicU8,
    generation: AtomicU32,
    autoplay_on_connect: bool,
}

impl<'a, M: RawMutex, S: Storage, D: StreamDecoder> PlaybackController<'a, M, S, D> {
    /// Build a stopped controller over a loaded catalog.
    pub fn new(catalog: CatalogIndex<S>, pipeline: AudioPipeline<S, D>, config: &PlayerConfig) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            pipeline: Mutex::new(pipeline),
            session: BlockingMutex::new(RefCell::new(Session::default())),
            observers: BlockingMutex::new(RefCell::new(Vec::new())),
            busy: AtomicBool::new(false),
            state: AtomicU8::new(PlaybackState::Stopped as u8),
            generation: AtomicU32::new(0),
            autoplay_on_connect: config.autoplay_on_connect,
        }
    }

    /// Register an observer. Returns `false` when all slots are taken.
    pub fn add_observer(&self, observer: &'a dyn PlaybackObserver) -> bool {
        self.observers.lock(|list| list.borrow_mut().push(observer).is_ok())
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` while a track open is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Counts successful track opens; changes whenever a new track starts.
    ///
    /// Lock-free, so the real-time pull can stamp its end-of-track report
    /// with the track it actually exhausted.
    pub fn track_generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Ordinal of the current track.
    pub fn current_ordinal(&self) -> Option<u32> {
        self.session.lock(|s| s.borrow().current)
    }

    /// Display name of the current track, empty when none.
    pub fn current_name(&self) -> TrackName {
        self.session.lock(|s| s.borrow().name.clone())
    }

    /// Tag metadata of the current track.
    pub fn current_metadata(&self) -> TrackMetadata {
        self.session.lock(|s| s.borrow().metadata.clone())
    }

    /// Number of tracks in the catalog.
    pub async fn track_count(&self) -> u32 {
        self.catalog.lock().await.track_count()
    }

    /// Display names of up to `count` tracks from `start`, for a list view.
    pub async fn names<const N: usize>(&self, start: u32, count: u32) -> Vec<TrackName, N> {
        self.catalog.lock().await.get_names(start, count)
    }

    /// The catalog, e.g. to rescan before playback starts.
    pub fn catalog(&self) -> &Mutex<M, CatalogIndex<S>> {
        &self.catalog
    }

    /// The pipeline, for the transport's pull.
    pub fn pipeline(&self) -> &Mutex<M, AudioPipeline<S, D>> {
        &self.pipeline
    }

    /// Estimated length of the current track, `0` if unknown or contended.
    pub fn duration_seconds(&self) -> u32 {
        self.pipeline.try_lock().map_or(0, |p| p.duration_seconds())
    }

    /// Estimated position in the current track, `0` if unknown or contended.
    pub fn position_seconds(&self) -> u32 {
        self.pipeline.try_lock().map_or(0, |p| p.position_seconds())
    }

    /// Fraction of the current track consumed.
    pub fn progress(&self) -> f32 {
        self.pipeline.try_lock().map_or(0.0, |p| p.progress())
    }

    fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn notify(&self) {
        let state = self.state();
        let (ordinal, name) = self.session.lock(|s| {
            let s = s.borrow();
            (s.current, s.name.clone())
        });
        self.observers.lock(|list| {
            for observer in list.borrow().iter() {
                observer.on_playback_changed(state, ordinal, name.as_str());
            }
        });
    }

    /// Execute `command`.
    pub async fn execute(&self, command: Command) -> Result<(), CommandError> {
        if self.is_busy() {
            tracing::debug!("controller: {:?} rejected, busy", command);
            return Err(CommandError::Busy);
        }
        tracing::debug!("controller: {:?} in {:?}", command, self.state());

        match command {
            Command::Play => {
                match self.state() {
                    PlaybackState::Playing => return Ok(()),
                    PlaybackState::Paused => {}
                    PlaybackState::Stopped if self.current_ordinal().is_some() => {}
                    PlaybackState::Stopped => return Err(CommandError::NoCurrentTrack),
                }
                self.set_state(PlaybackState::Playing);
                self.notify();
                Ok(())
            }
            Command::Pause => {
                if self.state() != PlaybackState::Playing {
                    return Err(CommandError::InvalidTransition);
                }
                self.set_state(PlaybackState::Paused);
                self.notify();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::NextTrack => self.open_track(self.step(true).await?).await,
            Command::PrevTrack => self.open_track(self.step(false).await?).await,
            Command::PlayTrack(ordinal) => self.open_track(ordinal).await,
        }
    }

    fn stop(&self) {
        if self.state() != PlaybackState::Stopped {
            self.set_state(PlaybackState::Stopped);
            self.notify();
        }
    }

    /// Ordinal after (or before) the current one, wrapping around the catalog.
    async fn step(&self, forward: bool) -> Result<u32, CommandError> {
        let count = self.track_count().await;
        if count == 0 {
            return Err(CommandError::NotFound);
        }
        let last = count.saturating_sub(1);
        let next = match (self.current_ordinal(), forward) {
            (None, true) => 0,
            (None, false) => last,
            (Some(i), true) => i.checked_add(1).filter(|&n| n < count).unwrap_or(0),
            (Some(i), false) => i.checked_sub(1).map_or(last, |p| p.min(last)),
        };
        Ok(next)
    }

    /// Resolve `ordinal`, open it, and make it the current track.
    ///
    /// On any failure the previous ordinal, name, and state are kept.
    pub async fn open_track(&self, ordinal: u32) -> Result<(), CommandError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(CommandError::Busy);
        }
        let result = self.open_track_guarded(ordinal).await;
        if let Err(e) = result {
            tracing::warn!("controller: open of track {} failed: {}", ordinal, e);
        }
        self.busy.store(false, Ordering::Release);
        result
    }

    async fn open_track_guarded(&self, ordinal: u32) -> Result<(), CommandError> {
        let (path, metadata) = {
            let mut catalog = self.catalog.lock().await;
            let path = catalog.get_path(ordinal).ok_or(CommandError::NotFound)?;
            let metadata = catalog.metadata_for(path.as_str());
            (path, metadata)
        };

        self.pipeline.lock().await.open(path.as_str())?;

        let name = name_from_path(path.as_str());
        tracing::info!("controller: playing #{} {}", ordinal, name.as_str());
        self.session.lock(|s| {
            let mut s = s.borrow_mut();
            s.current = Some(ordinal);
            s.name = name;
            s.metadata = metadata;
        });
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(PlaybackState::Playing);
        self.notify();
        Ok(())
    }

    /// The transport reached the end of the current track: advance.
    ///
    /// Dropped while an open is in flight.
    pub async fn notify_track_finished(&self) -> Result<(), CommandError> {
        if self.is_busy() {
            tracing::debug!("controller: track-finished dropped, busy");
            return Ok(());
        }
        self.execute(Command::NextTrack).await
    }

    /// A sink connected or disconnected.
    ///
    /// Disconnect forces `Stopped`. Connect starts playback when autoplay is
    /// on: ordinal 0 if nothing is current, otherwise a resume.
    pub async fn on_connection_changed(&self, connected: bool) -> Result<(), CommandError> {
        if !connected {
            self.stop();
            return Ok(());
        }
        if !self.autoplay_on_connect || self.track_count().await == 0 {
            return Ok(());
        }
        match self.current_ordinal() {
            None => self.open_track(0).await,
            Some(_) => self.execute(Command::Play).await,
        }
    }
}
