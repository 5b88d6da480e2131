//! Controller scenarios over an in-memory card.
//!
//! Every test builds a real catalog (scan of a `MemStorage` volume) and a real
//! pipeline with the PCM passthrough decoder, then drives the controller the
//! way the transport and the UI would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::cell::RefCell;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use library::CatalogIndex;
use platform::mocks::MemStorage;
use platform::PlayerConfig;
use playback::mocks::PcmPassthroughDecoder;
use playback::{AudioPipeline, Command, CommandError, PlaybackController, PlaybackObserver, PlaybackState};

type Controller<'a> = PlaybackController<'a, CriticalSectionRawMutex, MemStorage, PcmPassthroughDecoder>;

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<(PlaybackState, Option<u32>, String)>>,
}

impl PlaybackObserver for Recorder {
    fn on_playback_changed(&self, state: PlaybackState, ordinal: Option<u32>, name: &str) {
        self.events.borrow_mut().push((state, ordinal, name.to_string()));
    }
}

fn card() -> MemStorage {
    let fs = MemStorage::new();
    fs.add_file("/a.mp3", &[1u8; 64]);
    fs.add_file("/b.mp3", &[2u8; 64]);
    fs.add_file("/c/d.mp3", &[3u8; 64]);
    fs
}

fn controller_with<'a>(fs: &MemStorage, cfg: &PlayerConfig) -> Controller<'a> {
    let mut catalog = CatalogIndex::new(fs.clone(), cfg);
    catalog.scan().expect("scan");
    let pipeline = AudioPipeline::new(fs.clone(), PcmPassthroughDecoder::new(), cfg);
    PlaybackController::new(catalog, pipeline, cfg)
}

fn controller<'a>(fs: &MemStorage) -> Controller<'a> {
    controller_with(fs, &PlayerConfig::DEFAULT)
}

#[tokio::test]
async fn test_starts_stopped_with_no_track() {
    let fs = card();
    let ctl = controller(&fs);
    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(ctl.current_ordinal(), None);
    assert!(ctl.current_name().is_empty());
    assert_eq!(ctl.track_count().await, 3);
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn test_play_track_opens_and_notifies() {
    let fs = card();
    let recorder = Recorder::default();
    let ctl = controller(&fs);
    assert!(ctl.add_observer(&recorder));

    ctl.execute(Command::PlayTrack(1)).await.unwrap();

    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(1));
    assert_eq!(ctl.current_name().as_str(), "b");
    assert_eq!(ctl.current_metadata().title.as_str(), "b");
    assert!(ctl.pipeline().try_lock().unwrap().is_open());
    assert_eq!(
        recorder.events.borrow().as_slice(),
        &[(PlaybackState::Playing, Some(1), "b".to_string())]
    );
}

#[tokio::test]
async fn test_play_track_out_of_range_is_not_found() {
    let fs = card();
    let recorder = Recorder::default();
    let ctl = controller(&fs);
    ctl.add_observer(&recorder);

    assert_eq!(ctl.execute(Command::PlayTrack(5)).await, Err(CommandError::NotFound));

    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(ctl.current_ordinal(), None);
    assert!(!ctl.is_busy());
    assert!(recorder.events.borrow().is_empty());
}

#[tokio::test]
async fn test_failed_open_keeps_previous_track() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();

    fs.add_file("/b.mp3", b"");
    assert_eq!(ctl.execute(Command::NextTrack).await, Err(CommandError::Empty));

    assert_eq!(ctl.current_ordinal(), Some(0));
    assert_eq!(ctl.current_name().as_str(), "a");
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn test_next_and_prev_wrap_around() {
    let fs = card();
    let ctl = controller(&fs);

    ctl.execute(Command::PlayTrack(2)).await.unwrap();
    ctl.execute(Command::NextTrack).await.unwrap();
    assert_eq!(ctl.current_ordinal(), Some(0));
    assert_eq!(ctl.current_name().as_str(), "a");

    ctl.execute(Command::PrevTrack).await.unwrap();
    assert_eq!(ctl.current_ordinal(), Some(2));
    assert_eq!(ctl.current_name().as_str(), "d");
}

#[tokio::test]
async fn test_next_without_current_starts_at_zero() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::NextTrack).await.unwrap();
    assert_eq!(ctl.current_ordinal(), Some(0));

    let ctl = controller(&fs);
    ctl.execute(Command::PrevTrack).await.unwrap();
    assert_eq!(ctl.current_ordinal(), Some(2));
}

#[tokio::test]
async fn test_pause_play_stop_transitions() {
    let fs = card();
    let recorder = Recorder::default();
    let ctl = controller(&fs);
    ctl.add_observer(&recorder);

    assert_eq!(ctl.execute(Command::Play).await, Err(CommandError::NoCurrentTrack));
    assert_eq!(ctl.execute(Command::Pause).await, Err(CommandError::InvalidTransition));

    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    ctl.execute(Command::Pause).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Paused);
    ctl.execute(Command::Play).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Playing);
    ctl.execute(Command::Stop).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Stopped);
    ctl.execute(Command::Stop).await.unwrap();
    ctl.execute(Command::Play).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(0));

    let states: Vec<PlaybackState> = recorder.events.borrow().iter().map(|e| e.0).collect();
    assert_eq!(
        states,
        [
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Playing,
            PlaybackState::Stopped,
            PlaybackState::Playing,
        ]
    );
}

#[tokio::test]
async fn test_busy_guard_rejects_every_command() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    let ctl = &ctl;

    // Holding the pipeline parks the next open mid-flight with busy set.
    let guard = ctl.pipeline().lock().await;
    let opener = ctl.open_track(2);
    let probe = async move {
        assert!(ctl.is_busy());
        for cmd in [
            Command::Play,
            Command::Pause,
            Command::Stop,
            Command::NextTrack,
            Command::PrevTrack,
            Command::PlayTrack(1),
        ] {
            assert_eq!(ctl.execute(cmd).await, Err(CommandError::Busy), "{cmd:?}");
        }
        assert_eq!(ctl.open_track(1).await, Err(CommandError::Busy));
        assert_eq!(ctl.notify_track_finished().await, Ok(()));
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert_eq!(ctl.current_ordinal(), Some(0));
        assert_eq!(ctl.current_name().as_str(), "a");
        drop(guard);
    };

    let (opened, ()) = join(opener, probe).await;
    assert_eq!(opened, Ok(()));
    assert_eq!(ctl.current_ordinal(), Some(2));
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn test_track_finished_advances() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();

    // Drain the track: 64 bytes, then the end-of-track sentinel.
    let mut buf = [0u8; 64];
    {
        let mut pipeline = ctl.pipeline().lock().await;
        assert_eq!(pipeline.read(&mut buf), 64);
        assert_eq!(pipeline.read(&mut buf), 0);
    }
    ctl.notify_track_finished().await.unwrap();

    assert_eq!(ctl.current_ordinal(), Some(1));
    assert_eq!(ctl.state(), PlaybackState::Playing);
    let mut pipeline = ctl.pipeline().lock().await;
    assert_eq!(pipeline.read(&mut buf), 64);
    assert_eq!(buf, [2u8; 64]);
}

#[tokio::test]
async fn test_connection_changes() {
    let fs = card();
    let ctl = controller(&fs);

    ctl.on_connection_changed(true).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(0));

    ctl.on_connection_changed(false).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(ctl.current_ordinal(), Some(0));

    ctl.on_connection_changed(true).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(0));
}

#[tokio::test]
async fn test_connect_without_autoplay_stays_stopped() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT.with_autoplay_on_connect(false);
    let ctl = controller_with(&fs, &cfg);
    ctl.on_connection_changed(true).await.unwrap();
    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(ctl.current_ordinal(), None);
}

#[tokio::test]
async fn test_empty_catalog_is_not_an_error() {
    let fs = MemStorage::new();
    fs.add_file("/notes.txt", b"hi");
    let ctl = controller(&fs);
    assert_eq!(ctl.track_count().await, 0);
    assert_eq!(ctl.on_connection_changed(true).await, Ok(()));
    assert_eq!(ctl.execute(Command::NextTrack).await, Err(CommandError::NotFound));
    assert_eq!(ctl.state(), PlaybackState::Stopped);
}

#[tokio::test]
async fn test_observer_slots_are_bounded() {
    let fs = card();
    let recorders: [Recorder; 5] = Default::default();
    let ctl = controller(&fs);
    for r in &recorders[..4] {
        assert!(ctl.add_observer(r));
    }
    assert!(!ctl.add_observer(&recorders[4]));
}

#[tokio::test]
async fn test_names_window_and_progress() {
    let fs = card();
    let ctl = controller(&fs);
    let names = ctl.names::<4>(1, 4).await;
    let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, ["b", "d"]);

    assert_eq!(ctl.progress(), 0.0);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    let mut buf = [0u8; 32];
    ctl.pipeline().lock().await.read(&mut buf);
    assert!((ctl.progress() - 0.5).abs() < 1e-6);
    // 64 bytes at the 128 kbps fallback rounds down to 0 s.
    assert_eq!(ctl.duration_seconds(), 0);
    assert_eq!(ctl.position_seconds(), 0);
}

#[tokio::test]
async fn test_pull_path_runs_while_catalog_is_held() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    let generation = ctl.track_generation();
    let ctl = &ctl;

    let catalog = ctl.catalog().lock().await;
    let opener = ctl.open_track(1);
    let reader = async move {
        assert!(ctl.is_busy());
        // Card I/O on the catalog side must not hold the pipeline.
        let mut buf = [0u8; 8];
        ctl.pipeline().try_lock().unwrap().read(&mut buf);
        assert_eq!(buf, [1u8; 8]);
        drop(catalog);
    };
    let (opened, ()) = join(opener, reader).await;
    assert_eq!(opened, Ok(()));
    assert_eq!(ctl.current_ordinal(), Some(1));
    assert_eq!(ctl.track_generation(), generation.wrapping_add(1));
}

#[tokio::test]
async fn test_failed_open_keeps_generation() {
    let fs = card();
    let ctl = controller(&fs);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    let generation = ctl.track_generation();
    assert_eq!(ctl.execute(Command::PlayTrack(9)).await, Err(CommandError::NotFound));
    assert_eq!(ctl.track_generation(), generation);
}
