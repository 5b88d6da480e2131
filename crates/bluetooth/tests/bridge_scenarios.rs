//! End-to-end bridge scenarios: stack callbacks in, PCM and sink volume out.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::unreachable)]
#![allow(clippy::indexing_slicing)]

use bluetooth::{BridgeTask, TransportBridge};
use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use library::CatalogIndex;
use platform::mocks::{MemStorage, RecordingSink};
use platform::{AbsoluteVolume, ConnectionState, PlayerConfig};
use playback::mocks::PcmPassthroughDecoder;
use playback::{AudioPipeline, Command, PlaybackController, PlaybackState};

type Controller<'a> = PlaybackController<'a, CriticalSectionRawMutex, MemStorage, PcmPassthroughDecoder>;

const PEER: [u8; 6] = [0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13];
const FORWARD: u8 = 0x4B;
const PAUSE: u8 = 0x46;
const STOP: u8 = 0x45;
const VOLUME_UP: u8 = 0x41;
const VOLUME_DOWN: u8 = 0x42;

fn card() -> MemStorage {
    let fs = MemStorage::new();
    fs.add_file("/a.mp3", &[1u8; 8]);
    fs.add_file("/b.mp3", &[2u8; 8]);
    fs.add_file("/c/d.mp3", &[3u8; 8]);
    fs
}

fn controller<'a>(fs: &MemStorage, cfg: &PlayerConfig) -> Controller<'a> {
    let mut catalog = CatalogIndex::new(fs.clone(), cfg);
    catalog.scan().expect("scan");
    let pipeline = AudioPipeline::new(fs.clone(), PcmPassthroughDecoder::new(), cfg);
    PlaybackController::new(catalog, pipeline, cfg)
}

#[tokio::test]
async fn test_pull_is_silence_until_connected() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);

    let mut buf = [0xAAu8; 16];
    assert_eq!(bridge.pull(&mut buf), 16);
    assert_eq!(buf, [0u8; 16]);
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_autoplays_and_pushes_volume() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());

    bridge.on_connection_state(ConnectionState::Connecting, None);
    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    assert_eq!(task.process_events().await, 1);

    assert_eq!(bridge.peer_address(), Some(PEER));
    assert_eq!(task.sink().volumes, [AbsoluteVolume::new(64)]);
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(0));

    let mut buf = [0u8; 8];
    assert_eq!(bridge.pull(&mut buf), 8);
    assert_eq!(buf, [1u8; 8]);
}

#[tokio::test]
async fn test_end_of_track_advances_through_catalog() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    task.process_events().await;
    ctl.execute(Command::PlayTrack(2)).await.unwrap();

    let mut buf = [0xAAu8; 8];
    assert_eq!(bridge.pull(&mut buf), 8);
    assert_eq!(buf, [3u8; 8]);

    // Exhausted: silence now, advance later on the control side.
    buf.fill(0xAA);
    assert_eq!(bridge.pull(&mut buf), 8);
    assert_eq!(buf, [0u8; 8]);
    assert_eq!(ctl.current_ordinal(), Some(2));
    assert_eq!(bridge.pull(&mut buf), 8);

    assert_eq!(task.process_events().await, 1);
    assert_eq!(ctl.current_ordinal(), Some(0));
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(bridge.pull(&mut buf), 8);
    assert_eq!(buf, [1u8; 8]);
}

#[tokio::test]
async fn test_keys_act_on_release_only() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    ctl.execute(Command::PlayTrack(0)).await.unwrap();

    assert!(!bridge.on_remote_key(FORWARD, false));
    assert_eq!(task.process_events().await, 0);
    assert_eq!(ctl.current_ordinal(), Some(0));

    assert!(bridge.on_remote_key(FORWARD, true));
    task.process_events().await;
    assert_eq!(ctl.current_ordinal(), Some(1));

    assert!(bridge.on_remote_key(PAUSE, true));
    task.process_events().await;
    assert_eq!(ctl.state(), PlaybackState::Paused);
    let mut buf = [0xAAu8; 8];
    assert_eq!(bridge.pull(&mut buf), 8);
    assert_eq!(buf, [0u8; 8]);

    assert!(!bridge.on_remote_key(0x7E, true));
}

#[tokio::test]
async fn test_keys_ignored_and_pull_silent_while_busy() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    ctl.execute(Command::PlayTrack(0)).await.unwrap();
    let ctl = &ctl;
    let bridge = &bridge;

    let guard = ctl.pipeline().lock().await;
    let opener = ctl.open_track(1);
    let probe = async move {
        assert!(ctl.is_busy());
        assert!(!bridge.on_remote_key(FORWARD, true));
        let mut buf = [0xAAu8; 8];
        assert_eq!(bridge.pull(&mut buf), 8);
        assert_eq!(buf, [0u8; 8]);
        drop(guard);
    };
    let (opened, ()) = join(opener, probe).await;
    assert_eq!(opened, Ok(()));
    assert_eq!(ctl.current_ordinal(), Some(1));
}

#[tokio::test]
async fn test_volume_keys_step_and_saturate() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT.with_volume_step(10);
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());

    bridge.on_remote_volume(AbsoluteVolume::new(120));
    bridge.on_remote_key(VOLUME_UP, true);
    task.process_events().await;
    assert_eq!(task.sink().last_volume(), Some(AbsoluteVolume::MAX));
    assert_eq!(bridge.volume(), AbsoluteVolume::MAX);

    bridge.on_remote_volume(AbsoluteVolume::new(5));
    bridge.on_remote_key(VOLUME_DOWN, true);
    task.process_events().await;
    assert_eq!(task.sink().last_volume(), Some(AbsoluteVolume::MIN));
    assert_eq!(ctl.state(), PlaybackState::Stopped);
}

#[tokio::test]
async fn test_reconnect_reapplies_volume_and_resets_position() {
    let fs = MemStorage::new();
    fs.add_file("/long.mp3", &vec![9u8; 176_400 * 3]);
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());

    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    task.process_events().await;
    let mut second = vec![0u8; 176_400];
    bridge.pull(&mut second);
    assert_eq!(ctl.pipeline().try_lock().unwrap().playback_seconds(), 1);

    bridge.on_remote_volume(AbsoluteVolume::new(90));
    bridge.on_connection_state(ConnectionState::Disconnected, None);
    task.process_events().await;
    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(bridge.peer_address(), None);
    bridge.pull(&mut second);
    assert!(second.iter().all(|&b| b == 0));

    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    task.process_events().await;
    assert_eq!(task.sink().last_volume(), Some(AbsoluteVolume::new(90)));
    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_ordinal(), Some(0));
    let pipeline = ctl.pipeline().try_lock().unwrap();
    assert_eq!(pipeline.playback_seconds(), 0);
    assert_eq!(pipeline.bytes_consumed(), 176_400);
}

#[tokio::test]
async fn test_event_queue_overflow_drops() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    for _ in 0..platform::config::EVENT_QUEUE_DEPTH {
        assert!(bridge.on_remote_key(VOLUME_UP, true));
    }
    assert!(!bridge.on_remote_key(VOLUME_UP, true));

    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    assert_eq!(task.process_events().await, platform::config::EVENT_QUEUE_DEPTH);
    assert_eq!(task.sink().volumes.len(), platform::config::EVENT_QUEUE_DEPTH);
}

/// Connect, autoplay track 0, and drain it so the pull reports end of track.
async fn exhaust_first_track<T: platform::A2dpSink>(
    bridge: &TransportBridge<'_, '_, CriticalSectionRawMutex, MemStorage, PcmPassthroughDecoder>,
    task: &mut BridgeTask<'_, '_, '_, CriticalSectionRawMutex, MemStorage, PcmPassthroughDecoder, T>,
) {
    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    task.process_events().await;
    let mut buf = [0u8; 8];
    bridge.pull(&mut buf);
    assert_eq!(buf, [1u8; 8]);
    bridge.pull(&mut buf);
    assert_eq!(buf, [0u8; 8]);
}

#[tokio::test]
async fn test_forward_after_end_of_track_skips_once() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    exhaust_first_track(&bridge, &mut task).await;

    assert!(bridge.on_remote_key(FORWARD, true));
    task.process_events().await;

    assert_eq!(ctl.current_ordinal(), Some(1));
    assert_eq!(ctl.state(), PlaybackState::Playing);
    let mut buf = [0u8; 8];
    bridge.pull(&mut buf);
    assert_eq!(buf, [2u8; 8]);
}

#[tokio::test]
async fn test_stop_after_end_of_track_stays_stopped() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    exhaust_first_track(&bridge, &mut task).await;

    assert!(bridge.on_remote_key(STOP, true));
    task.process_events().await;

    assert_eq!(ctl.state(), PlaybackState::Stopped);
    assert_eq!(ctl.current_ordinal(), Some(0));
}

#[tokio::test]
async fn test_forward_after_end_of_single_track_reopens_once() {
    let fs = MemStorage::new();
    fs.add_file("/only.mp3", &[7u8; 8]);
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    bridge.on_connection_state(ConnectionState::Connected, Some(PEER));
    task.process_events().await;
    let mut buf = [0u8; 8];
    bridge.pull(&mut buf);
    bridge.pull(&mut buf);
    let before = ctl.track_generation();

    assert!(bridge.on_remote_key(FORWARD, true));
    task.process_events().await;

    assert_eq!(ctl.track_generation(), before.wrapping_add(1));
    assert_eq!(ctl.current_ordinal(), Some(0));
}

#[tokio::test]
async fn test_process_next_handles_queued_key() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    ctl.execute(Command::PlayTrack(0)).await.unwrap();

    assert!(bridge.on_remote_key(PAUSE, true));
    task.process_next().await;
    assert_eq!(ctl.state(), PlaybackState::Paused);
}

#[tokio::test]
async fn test_process_next_advances_at_end_of_track() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    ctl.execute(Command::PlayTrack(1)).await.unwrap();

    let mut buf = [0u8; 8];
    bridge.pull(&mut buf);
    bridge.pull(&mut buf);
    task.process_next().await;

    assert_eq!(ctl.current_ordinal(), Some(2));
    assert_eq!(ctl.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_run_serves_keys_until_cancelled() {
    let fs = card();
    let cfg = PlayerConfig::DEFAULT;
    let ctl = controller(&fs, &cfg);
    let bridge = TransportBridge::new(&ctl, &cfg);
    let mut task = BridgeTask::new(&bridge, RecordingSink::connected());
    ctl.execute(Command::PlayTrack(0)).await.unwrap();

    let driver = async {
        assert!(bridge.on_remote_key(FORWARD, true));
        while ctl.current_ordinal() != Some(1) {
            tokio::task::yield_now().await;
        }
    };
    match select(task.run(), driver).await {
        Either::First(_) => unreachable!("run never returns"),
        Either::Second(()) => {}
    }
    assert_eq!(ctl.state(), PlaybackState::Playing);
}
