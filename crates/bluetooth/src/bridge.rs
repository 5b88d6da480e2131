//! Transport bridge — the boundary between the A2DP stack and the player.
//!
//! Two halves share one [`TransportBridge`]:
//!
//! - **Stack side** ([`TransportBridge::pull`], `on_*` callbacks): runs in the
//!   stack's context, possibly at interrupt level. Never awaits, never touches
//!   storage except through the pipeline read. Anything that needs file I/O
//!   or the sink is queued.
//! - **Control side** ([`BridgeTask`]): drains the queue and the
//!   track-finished signal, drives the controller, and pushes volume to the
//!   sink.
//!
//! The track-finished signal carries the controller's track generation at
//! the moment the pull hit end of track. By the time the control side sees
//! it, a queued key may already have skipped or stopped; a report whose
//! generation no longer matches, or that arrives outside `Playing`, is
//! dropped.
//!
//! ```text
//! A2DP stack ──pull──▶ TransportBridge ──try_lock──▶ AudioPipeline
//!      │                    │ events / finished
//!      └──callbacks────────▶│
//!                           ▼
//!                       BridgeTask ──▶ PlaybackController, A2dpSink
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use platform::audio_types::AbsoluteVolume;
use platform::config::{PlayerConfig, EVENT_QUEUE_DEPTH};
use platform::storage::Storage;
use platform::{A2dpSink, ConnectionState};
use playback::{PlaybackController, PlaybackState, StreamDecoder};

use crate::avrc::RemoteKey;
use crate::state::{ConnectionTracker, LinkChange};

/// Work handed from the stack side to the control side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeEvent {
    /// A sink connected.
    Connected,
    /// The sink went away.
    Disconnected,
    /// A remote key was released.
    Key(RemoteKey),
}

/// State shared between the stack callbacks and [`BridgeTask`].
pub struct TransportBridge<'c, 'a, M: RawMutex, S: Storage, D: StreamDecoder> {
    controller: &'c PlaybackController<'a, M, S, D>,
    events: Channel<M, BridgeEvent, EVENT_QUEUE_DEPTH>,
    track_finished: Signal<M, u32>,
    tracker: BlockingMutex<M, RefCell<ConnectionTracker>>,
    volume: AtomicU8,
    volume_step: u8,
}

impl<'c, 'a, M: RawMutex, S: Storage, D: StreamDecoder> TransportBridge<'c, 'a, M, S, D> {
    /// Create a bridge in front of `controller`.
    pub fn new(controller: &'c PlaybackController<'a, M, S, D>, config: &PlayerConfig) -> Self {
        Self {
            controller,
            events: Channel::new(),
            track_finished: Signal::new(),
            tracker: BlockingMutex::new(RefCell::new(ConnectionTracker::new())),
            volume: AtomicU8::new(config.initial_volume.get()),
            volume_step: config.volume_step,
        }
    }

    /// The controller this bridge drives.
    pub fn controller(&self) -> &'c PlaybackController<'a, M, S, D> {
        self.controller
    }

    /// Real-time pull: fill `buf` with PCM and return its full length.
    ///
    /// Silence while an open is in flight, while not playing, or while the
    /// control side holds the pipeline. At end of track the buffer is silence
    /// and the control side is signalled to advance.
    pub fn pull(&self, buf: &mut [u8]) -> usize {
        if self.controller.is_busy() || self.controller.state() != PlaybackState::Playing {
            buf.fill(0);
            return buf.len();
        }
        let Ok(mut pipeline) = self.controller.pipeline().try_lock() else {
            tracing::trace!("bridge: pipeline contended, silence");
            buf.fill(0);
            return buf.len();
        };
        if pipeline.read(buf) == 0 {
            buf.fill(0);
            self.track_finished.signal(self.controller.track_generation());
        }
        buf.len()
    }

    /// Link state callback.
    pub fn on_connection_state(&self, state: ConnectionState, peer: Option<[u8; 6]>) {
        let change = self.tracker.lock(|t| t.borrow_mut().on_state(state, peer));
        tracing::debug!("bridge: link {:?} -> {:?}", state, change);
        match change {
            LinkChange::Up => {
                self.enqueue(BridgeEvent::Connected);
            }
            LinkChange::Down => {
                self.enqueue(BridgeEvent::Disconnected);
            }
            LinkChange::None => {}
        }
    }

    /// Remote key callback. Acts on release only, and only when idle.
    ///
    /// Returns `true` if the key was queued.
    pub fn on_remote_key(&self, code: u8, released: bool) -> bool {
        if !released {
            return false;
        }
        if self.controller.is_busy() {
            tracing::debug!("bridge: key {:#04x} ignored, busy", code);
            return false;
        }
        let Some(key) = RemoteKey::from_code(code) else {
            tracing::debug!("bridge: unhandled key {:#04x}", code);
            return false;
        };
        self.enqueue(BridgeEvent::Key(key))
    }

    /// The sink reported its absolute volume.
    pub fn on_remote_volume(&self, volume: AbsoluteVolume) {
        self.volume.store(volume.get(), Ordering::Release);
    }

    /// Last known sink volume.
    pub fn volume(&self) -> AbsoluteVolume {
        AbsoluteVolume::new(self.volume.load(Ordering::Acquire))
    }

    /// Link state as last reported.
    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.lock(|t| t.borrow().state())
    }

    /// Address of the connected peer.
    pub fn peer_address(&self) -> Option<[u8; 6]> {
        self.tracker.lock(|t| t.borrow().peer_address())
    }

    fn enqueue(&self, event: BridgeEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("bridge: event queue full, dropped {:?}", event);
                false
            }
        }
    }
}

/// Control-side half of the bridge: owns the sink.
pub struct BridgeTask<'b, 'c, 'a, M: RawMutex, S: Storage, D: StreamDecoder, T: A2dpSink> {
    bridge: &'b TransportBridge<'c, 'a, M, S, D>,
    sink: T,
}

impl<'b, 'c, 'a, M: RawMutex, S: Storage, D: StreamDecoder, T: A2dpSink> BridgeTask<'b, 'c, 'a, M, S, D, T> {
    /// Pair `bridge` with the sink handle.
    pub fn new(bridge: &'b TransportBridge<'c, 'a, M, S, D>, sink: T) -> Self {
        Self { bridge, sink }
    }

    /// The sink handle.
    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Handle everything already queued without waiting.
    ///
    /// Returns the number of items handled.
    pub async fn process_events(&mut self) -> usize {
        let mut handled = 0usize;
        while let Ok(event) = self.bridge.events.try_receive() {
            self.handle(event).await;
            handled = handled.saturating_add(1);
        }
        if let Some(generation) = self.bridge.track_finished.try_take() {
            self.track_finished(generation).await;
            handled = handled.saturating_add(1);
        }
        handled
    }

    /// Wait for the next queued event or end of track and handle it.
    pub async fn process_next(&mut self) {
        match select(self.bridge.events.receive(), self.bridge.track_finished.wait()).await {
            Either::First(event) => self.handle(event).await,
            Either::Second(generation) => self.track_finished(generation).await,
        }
    }

    /// Serve the bridge forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.process_next().await;
        }
    }

    async fn track_finished(&mut self, generation: u32) {
        let controller = self.bridge.controller;
        if controller.track_generation() != generation || controller.state() != PlaybackState::Playing {
            tracing::debug!("bridge: stale end of track dropped");
            return;
        }
        if let Err(e) = controller.notify_track_finished().await {
            tracing::warn!("bridge: advance after end of track failed: {}", e);
        }
    }

    async fn handle(&mut self, event: BridgeEvent) {
        let controller = self.bridge.controller;
        let result = match event {
            BridgeEvent::Connected => {
                controller.pipeline().lock().await.reset_position();
                self.sink.set_volume(self.bridge.volume());
                controller.on_connection_changed(true).await
            }
            BridgeEvent::Disconnected => {
                // A finished signal raised before the link dropped is stale.
                self.bridge.track_finished.reset();
                controller.on_connection_changed(false).await
            }
            BridgeEvent::Key(RemoteKey::VolumeUp) => {
                self.step_volume(true);
                Ok(())
            }
            BridgeEvent::Key(RemoteKey::VolumeDown) => {
                self.step_volume(false);
                Ok(())
            }
            BridgeEvent::Key(key) => match key.command() {
                Some(command) => controller.execute(command).await,
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            tracing::debug!("bridge: {:?} not applied: {}", event, e);
        }
    }

    fn step_volume(&mut self, up: bool) {
        let current = self.bridge.volume();
        let next = if up {
            current.step_up(self.bridge.volume_step)
        } else {
            current.step_down(self.bridge.volume_step)
        };
        self.bridge.on_remote_volume(next);
        self.sink.set_volume(next);
        tracing::debug!("bridge: volume {} -> {}", current.get(), next.get());
    }
}
