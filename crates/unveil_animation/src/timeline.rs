//! Timeline orchestration
//!
//! A timeline owns a set of value tracks, each starting at its own
//! offset with its own duration, easing, and endpoints. One clock
//! drives all tracks, with looping, alternate (ping-pong) mode, a
//! playback rate, and seeking. Staggered cascades are built with
//! [`StaggerBuilder`].

use slotmap::{new_key_type, SlotMap};

use crate::easing::Easing;
use crate::interpolate::Interpolate;

new_key_type! {
    /// Handle to a single track within a [`Timeline`]
    pub struct TimelineEntryId;
}

#[derive(Clone, Copy, Debug)]
struct TimelineEntry {
    offset_ms: i32,
    duration_ms: u32,
    start_value: f32,
    end_value: f32,
    easing: Easing,
}

/// A multi-track animation driven by one clock
#[derive(Clone, Debug)]
pub struct Timeline {
    entries: SlotMap<TimelineEntryId, TimelineEntry>,
    time_ms: f32,
    playing: bool,
    paused: bool,
    /// Total number of plays; -1 loops forever
    loop_count: i32,
    loops_done: i32,
    alternate: bool,
    reversed: bool,
    playback_rate: f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            time_ms: 0.0,
            playing: false,
            paused: false,
            loop_count: 1,
            loops_done: 0,
            alternate: false,
            reversed: false,
            playback_rate: 1.0,
        }
    }

    /// Add a linear track
    ///
    /// Returns an entry ID for querying the track's current value.
    /// A negative offset starts the track before the timeline clock,
    /// so it is already partway through at time zero.
    pub fn add(
        &mut self,
        offset_ms: i32,
        duration_ms: u32,
        start_value: f32,
        end_value: f32,
    ) -> TimelineEntryId {
        self.add_with_easing(offset_ms, duration_ms, start_value, end_value, Easing::Linear)
    }

    /// Add a track with a specific easing function
    pub fn add_with_easing(
        &mut self,
        offset_ms: i32,
        duration_ms: u32,
        start_value: f32,
        end_value: f32,
        easing: Easing,
    ) -> TimelineEntryId {
        self.entries.insert(TimelineEntry {
            offset_ms,
            duration_ms,
            start_value,
            end_value,
            easing,
        })
    }

    /// Set total play count (-1 for infinite)
    pub fn set_loop(&mut self, count: i32) {
        self.loop_count = count;
    }

    /// Enable/disable alternate (ping-pong) mode
    ///
    /// When enabled, the timeline reverses direction each loop instead
    /// of jumping back to the start.
    pub fn set_alternate(&mut self, enabled: bool) {
        self.alternate = enabled;
    }

    /// Set playback rate (1.0 = normal speed, 2.0 = 2x speed)
    pub fn set_playback_rate(&mut self, rate: f32) {
        self.playback_rate = rate;
    }

    /// Start playing from the beginning
    pub fn start(&mut self) {
        self.time_ms = 0.0;
        self.loops_done = 0;
        self.reversed = false;
        self.paused = false;
        self.playing = true;
    }

    /// Stop without resetting the clock
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Pause the timeline (can be resumed)
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume a paused timeline
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flip the playback direction
    pub fn reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// Jump the clock to a specific time
    pub fn seek(&mut self, time_ms: f32) {
        self.time_ms = time_ms.clamp(0.0, self.total_duration_ms());
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_ids(&self) -> Vec<TimelineEntryId> {
        self.entries.keys().collect()
    }

    /// End of the last track, in milliseconds
    pub fn total_duration_ms(&self) -> f32 {
        self.entries
            .values()
            .map(|e| (e.offset_ms + e.duration_ms as i32).max(0) as f32)
            .fold(0.0, f32::max)
    }

    /// Overall clock progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        let total = self.total_duration_ms();
        if total <= 0.0 {
            return 1.0;
        }
        (self.time_ms / total).clamp(0.0, 1.0)
    }

    /// Raw progress of one track (0.0 to 1.0, before easing)
    pub fn entry_progress(&self, id: TimelineEntryId) -> Option<f32> {
        let entry = self.entries.get(id)?;
        Some(Self::local_progress(entry, self.time_ms))
    }

    /// Current eased value of one track
    pub fn value(&self, id: TimelineEntryId) -> Option<f32> {
        let entry = self.entries.get(id)?;
        let t = Self::local_progress(entry, self.time_ms);
        let eased = entry.easing.apply(t);
        Some(entry.start_value.lerp(&entry.end_value, eased))
    }

    fn local_progress(entry: &TimelineEntry, time_ms: f32) -> f32 {
        if entry.duration_ms == 0 {
            return if time_ms >= entry.offset_ms as f32 {
                1.0
            } else {
                0.0
            };
        }
        let local = time_ms - entry.offset_ms as f32;
        (local / entry.duration_ms as f32).clamp(0.0, 1.0)
    }

    /// Advance the clock by delta time (in milliseconds)
    pub fn tick(&mut self, dt_ms: f32) {
        if !self.is_playing() {
            return;
        }

        let total = self.total_duration_ms();
        if total <= 0.0 {
            self.playing = false;
            return;
        }

        let dt = dt_ms * self.playback_rate;
        if self.reversed {
            self.time_ms -= dt;
        } else {
            self.time_ms += dt;
        }

        if !self.reversed && self.time_ms >= total {
            self.complete_iteration(total, total);
        } else if self.reversed && self.time_ms <= 0.0 {
            self.complete_iteration(total, 0.0);
        }
    }

    fn complete_iteration(&mut self, total: f32, end: f32) {
        self.loops_done += 1;
        let more = self.loop_count < 0 || self.loops_done < self.loop_count;
        if !more {
            self.time_ms = end;
            self.playing = false;
            return;
        }

        if self.alternate {
            // Reflect the overshoot back into range
            self.reversed = !self.reversed;
            self.time_ms = (2.0 * end - self.time_ms).clamp(0.0, total);
        } else if self.reversed {
            self.time_ms += total;
        } else {
            self.time_ms -= total;
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a cascade of identical tracks with per-index delay
///
/// Entry `i` starts at `base_offset + i * step`, so a list of items
/// animates in one after another instead of all at once.
///
/// # Example
///
/// ```rust
/// use unveil_animation::{Easing, StaggerBuilder, Timeline};
///
/// let mut timeline = Timeline::new();
/// let ids = StaggerBuilder::new()
///     .step(100)
///     .duration(600)
///     .easing(Easing::CubicOut)
///     .add_to(&mut timeline, 4);
/// assert_eq!(ids.len(), 4);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct StaggerBuilder {
    base_offset_ms: i32,
    step_ms: u32,
    duration_ms: u32,
    start_value: f32,
    end_value: f32,
    easing: Easing,
}

impl StaggerBuilder {
    pub fn new() -> Self {
        Self {
            base_offset_ms: 0,
            step_ms: 100,
            duration_ms: 600,
            start_value: 0.0,
            end_value: 1.0,
            easing: Easing::EaseOut,
        }
    }

    /// Offset of the first entry
    pub fn offset(mut self, offset_ms: i32) -> Self {
        self.base_offset_ms = offset_ms;
        self
    }

    /// Delay added per index
    pub fn step(mut self, step_ms: u32) -> Self {
        self.step_ms = step_ms;
        self
    }

    /// Duration of each entry
    pub fn duration(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Start and end value of each entry
    pub fn values(mut self, start: f32, end: f32) -> Self {
        self.start_value = start;
        self.end_value = end;
        self
    }

    /// Easing of each entry
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Append `count` staggered entries to the timeline
    pub fn add_to(&self, timeline: &mut Timeline, count: usize) -> Vec<TimelineEntryId> {
        (0..count)
            .map(|i| {
                let offset = self.base_offset_ms + (i as u32 * self.step_ms) as i32;
                timeline.add_with_easing(
                    offset,
                    self.duration_ms,
                    self.start_value,
                    self.end_value,
                    self.easing,
                )
            })
            .collect()
    }
}

impl Default for StaggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_animate_at_offsets() {
        let mut timeline = Timeline::new();
        let first = timeline.add(0, 1000, 0.0, 100.0);
        let second = timeline.add(500, 1000, 0.0, 100.0);
        timeline.start();

        assert_eq!(timeline.value(first), Some(0.0));
        assert_eq!(timeline.value(second), Some(0.0));

        timeline.tick(500.0);
        assert_eq!(timeline.value(first), Some(50.0));
        assert_eq!(timeline.value(second), Some(0.0));

        timeline.tick(500.0);
        assert_eq!(timeline.value(first), Some(100.0));
        assert_eq!(timeline.value(second), Some(50.0));

        timeline.tick(500.0);
        assert_eq!(timeline.value(second), Some(100.0));
        assert!(!timeline.is_playing());
    }

    #[test]
    fn test_negative_offset_starts_partway() {
        let mut timeline = Timeline::new();
        let entry = timeline.add(-500, 1000, 0.0, 100.0);
        timeline.start();
        assert_eq!(timeline.value(entry), Some(50.0));
    }

    #[test]
    fn test_loop_wraps_clock() {
        let mut timeline = Timeline::new();
        let entry = timeline.add(0, 1000, 0.0, 100.0);
        timeline.set_loop(-1);
        timeline.start();

        timeline.tick(1250.0);
        assert!(timeline.is_playing());
        assert_eq!(timeline.value(entry), Some(25.0));
    }

    #[test]
    fn test_alternate_reverses_each_loop() {
        let mut timeline = Timeline::new();
        let entry = timeline.add(0, 1000, 0.0, 100.0);
        timeline.set_loop(-1);
        timeline.set_alternate(true);
        timeline.start();

        // 1250ms in: bounced off the end, now at 750 heading back.
        timeline.tick(1250.0);
        assert_eq!(timeline.value(entry), Some(75.0));

        timeline.tick(500.0);
        assert_eq!(timeline.value(entry), Some(25.0));
    }

    #[test]
    fn test_seek_and_progress() {
        let mut timeline = Timeline::new();
        timeline.add(0, 2000, 0.0, 1.0);
        timeline.start();
        timeline.seek(500.0);
        assert_eq!(timeline.progress(), 0.25);

        timeline.seek(9999.0);
        assert_eq!(timeline.progress(), 1.0);
    }

    #[test]
    fn test_pause_resume() {
        let mut timeline = Timeline::new();
        let entry = timeline.add(0, 1000, 0.0, 100.0);
        timeline.start();
        timeline.tick(250.0);
        timeline.pause();
        assert!(!timeline.is_playing());

        timeline.tick(250.0);
        assert_eq!(timeline.value(entry), Some(25.0));

        timeline.resume();
        timeline.tick(250.0);
        assert_eq!(timeline.value(entry), Some(50.0));
    }

    #[test]
    fn test_playback_rate() {
        let mut timeline = Timeline::new();
        let entry = timeline.add(0, 1000, 0.0, 100.0);
        timeline.set_playback_rate(2.0);
        timeline.start();
        timeline.tick(250.0);
        assert_eq!(timeline.value(entry), Some(50.0));
    }

    #[test]
    fn test_stagger_builder_offsets() {
        let mut timeline = Timeline::new();
        let ids = StaggerBuilder::new()
            .offset(200)
            .step(100)
            .duration(400)
            .values(0.0, 1.0)
            .easing(Easing::Linear)
            .add_to(&mut timeline, 3);
        timeline.start();

        // At 400ms: entry 0 is 200ms in, entry 1 is 100ms in, entry 2 just starting.
        timeline.tick(400.0);
        assert_eq!(timeline.value(ids[0]), Some(0.5));
        assert_eq!(timeline.value(ids[1]), Some(0.25));
        assert_eq!(timeline.value(ids[2]), Some(0.0));

        assert_eq!(timeline.total_duration_ms(), 800.0);
    }
}
