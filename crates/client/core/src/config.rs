//! Engine configuration structures and loaders.
use std::env;
use std::time::Duration;

/// Configuration required to run an encounter engine.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub poll: PollConfig,
    pub animation: AnimationConfig,
    pub messages: MessageConfig,
    pub channels: ChannelConfig,
}

impl EngineConfig {
    pub const fn new(
        poll: PollConfig,
        animation: AnimationConfig,
        messages: MessageConfig,
        channels: ChannelConfig,
    ) -> Self {
        Self {
            poll,
            animation,
            messages,
            channels,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// - `COMBAT_POLL_WARMUP_MS` / `COMBAT_POLL_STEADY_MS`
    /// - `COMBAT_SWING_FPS` / `COMBAT_IMPACT_FRACTION`
    /// - `COMBAT_MESSAGE_CAPACITY`
    /// - `COMBAT_EVENT_BUFFER` / `COMBAT_COMMAND_BUFFER`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("COMBAT_POLL_WARMUP_MS") {
            config.poll.warmup = Duration::from_millis(ms.max(1));
        }

        if let Some(ms) = read_env::<u64>("COMBAT_POLL_STEADY_MS") {
            config.poll.steady = Duration::from_millis(ms.max(1));
        }

        if let Some(fps) = read_env::<u32>("COMBAT_SWING_FPS") {
            config.animation.frame_rate = fps.max(1);
        }

        if let Some(fraction) = read_env::<f32>("COMBAT_IMPACT_FRACTION")
            && (0.0..=1.0).contains(&fraction)
        {
            config.animation.impact_fraction = fraction;
        }

        if let Some(capacity) = read_env::<usize>("COMBAT_MESSAGE_CAPACITY") {
            config.messages.capacity = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("COMBAT_EVENT_BUFFER") {
            config.channels.event_buffer = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("COMBAT_COMMAND_BUFFER") {
            config.channels.command_buffer = capacity.max(1);
        }

        config
    }
}

/// Snapshot polling cadence.
///
/// Polls run at `warmup` until the first snapshot has been presented, then
/// relax to `steady`.
#[derive(Clone, Debug)]
pub struct PollConfig {
    pub warmup: Duration,
    pub steady: Duration,
}

impl PollConfig {
    pub fn interval(&self, initialized: bool) -> Duration {
        if initialized { self.steady } else { self.warmup }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(400),
            steady: Duration::from_millis(1500),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationConfig {
    /// Tween toward the staging position.
    pub approach: Duration,
    /// Tween back to the base position.
    pub recover: Duration,
    /// Pause after a swing before the next queued action starts.
    pub gap: Duration,
    pub frame_rate: u32,
    pub min_swing: Duration,
    pub max_swing: Duration,
    /// Point within the swing at which the hit reaction fires.
    pub impact_fraction: f32,
}

impl AnimationConfig {
    /// Swing length for a clip with `frames` frames, clamped to the
    /// configured bounds.
    pub fn swing_duration(&self, frames: u32) -> Duration {
        let millis = u64::from(frames) * 1000 / u64::from(self.frame_rate.max(1));
        let raw = Duration::from_millis(millis);
        raw.clamp(self.min_swing, self.max_swing)
    }

    pub fn impact_delay(&self, swing: Duration) -> Duration {
        swing.mul_f32(self.impact_fraction.clamp(0.0, 1.0))
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            approach: Duration::from_millis(220),
            recover: Duration::from_millis(220),
            gap: Duration::from_millis(150),
            frame_rate: 12,
            min_swing: Duration::from_millis(200),
            max_swing: Duration::from_millis(900),
            impact_fraction: 0.45,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer: 16,
            event_buffer: 64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageConfig {
    pub capacity: usize,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
