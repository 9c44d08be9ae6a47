use crate::library;
use crate::model::SourceHandle;
use anyhow::{Context, Result};
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::time::{Duration, Instant};

const MAX_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    PositionChanged(Duration),
    DurationKnown(Duration),
    Ended,
}

/// The audio output the transport commands. Commands are fire-and-forget;
/// progress comes back through [`MediaSink::poll_events`].
pub trait MediaSink {
    /// Loads a source paused at position zero, replacing whatever was loaded.
    fn load(&mut self, source: &SourceHandle) -> Result<()>;
    /// Drops the loaded source so its handle can be released.
    fn unload(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn is_loaded(&self) -> bool;
    fn position(&self) -> Duration;
    fn set_position(&mut self, position: Duration) -> Result<()>;
    fn duration(&self) -> Option<Duration>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn poll_events(&mut self) -> Vec<SinkEvent>;
}

impl<S: MediaSink + ?Sized> MediaSink for Box<S> {
    fn load(&mut self, source: &SourceHandle) -> Result<()> {
        (**self).load(source)
    }

    fn unload(&mut self) {
        (**self).unload()
    }

    fn play(&mut self) {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }

    fn position(&self) -> Duration {
        (**self).position()
    }

    fn set_position(&mut self, position: Duration) -> Result<()> {
        (**self).set_position(position)
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }

    fn volume(&self) -> f32 {
        (**self).volume()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn poll_events(&mut self) -> Vec<SinkEvent> {
        (**self).poll_events()
    }
}

/// Tracks which one-shot events have already been emitted for the loaded
/// source, so each sink reports `DurationKnown` and `Ended` once per load.
#[derive(Debug, Default)]
struct EventLatch {
    duration_reported: bool,
    ended_reported: bool,
    last_position: Option<Duration>,
}

impl EventLatch {
    fn collect(
        &mut self,
        position: Duration,
        duration: Option<Duration>,
        finished: bool,
    ) -> Vec<SinkEvent> {
        let mut events = Vec::new();
        if !self.duration_reported
            && let Some(duration) = duration
        {
            self.duration_reported = true;
            events.push(SinkEvent::DurationKnown(duration));
        }
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            events.push(SinkEvent::PositionChanged(position));
        }
        if finished && !self.ended_reported {
            self.ended_reported = true;
            events.push(SinkEvent::Ended);
        }
        events
    }
}

pub struct RodioMediaSink {
    stream: OutputStream,
    sink: Sink,
    current: Option<SourceHandle>,
    track_duration: Option<Duration>,
    volume: f32,
    latch: EventLatch,
}

impl RodioMediaSink {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start default output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 1.0,
            latch: EventLatch::default(),
        })
    }

    fn open(&mut self, source: &SourceHandle) -> Result<()> {
        let path = source.path();
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let decoded = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = decoded
            .total_duration()
            .filter(|duration| !duration.is_zero())
            .or_else(|| library::probe_duration(path));
        self.sink.append(decoded);
        self.sink.set_volume(self.volume);
        Ok(())
    }
}

impl MediaSink for RodioMediaSink {
    fn load(&mut self, source: &SourceHandle) -> Result<()> {
        self.current = None;
        self.track_duration = None;
        self.latch = EventLatch::default();
        self.open(source)?;
        self.current = Some(source.clone());
        log::info!("loaded {}", source.path().display());
        Ok(())
    }

    fn unload(&mut self) {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.current = None;
        self.track_duration = None;
        self.latch = EventLatch::default();
    }

    fn play(&mut self) {
        if self.current.is_some() {
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        self.sink.get_pos()
    }

    fn set_position(&mut self, position: Duration) -> Result<()> {
        let Some(current) = self.current.clone() else {
            return Err(anyhow::anyhow!("no active track"));
        };

        // An exhausted source cannot seek; decode it again first.
        if self.sink.empty() {
            let was_paused = self.sink.is_paused();
            self.open(&current)?;
            self.latch.ended_reported = false;
            if !was_paused {
                self.sink.play();
            }
        }

        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))?;
        if self.latch.ended_reported && self.track_duration.is_none_or(|end| position < end) {
            self.latch.ended_reported = false;
        }
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
        self.sink.set_volume(self.volume);
    }

    fn poll_events(&mut self) -> Vec<SinkEvent> {
        if self.current.is_none() {
            return Vec::new();
        }
        let finished = !self.sink.is_paused() && self.sink.empty();
        let position = self.sink.get_pos();
        self.latch.collect(position, self.track_duration, finished)
    }
}

/// Headless sink with a wall-clock position. Used when no output device can
/// be opened.
pub struct NullMediaSink {
    paused: bool,
    current: Option<SourceHandle>,
    volume: f32,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    latch: EventLatch,
}

impl NullMediaSink {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            volume: 1.0,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            latch: EventLatch::default(),
        }
    }

    fn estimate_duration(source: &SourceHandle) -> Option<Duration> {
        let file = File::open(source.path()).ok()?;
        let decoded = Decoder::try_from(file).ok()?;
        decoded
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }
}

impl Default for NullMediaSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for NullMediaSink {
    fn load(&mut self, source: &SourceHandle) -> Result<()> {
        self.paused = true;
        self.current = Some(source.clone());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(source);
        self.latch = EventLatch::default();
        Ok(())
    }

    fn unload(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
        self.latch = EventLatch::default();
    }

    fn play(&mut self) {
        if self.current.is_some() && self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        self.current_position()
    }

    fn set_position(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no active track"));
        }

        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        if !self.is_finished() {
            self.latch.ended_reported = false;
        }
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
    }

    fn poll_events(&mut self) -> Vec<SinkEvent> {
        if self.current.is_none() {
            return Vec::new();
        }
        let position = self.current_position();
        let finished = self.is_finished();
        self.latch.collect(position, self.track_duration, finished)
    }
}
