//! Animation scheduler
//!
//! Manages all active animations and updates them each frame.
//! Animations are implicitly registered when created through wrapper types:
//! - `AnimatedSpring` - Spring-based physics animations
//! - `AnimatedTween` - Eased, reversible timed animations
//! - `AnimatedTimeline` - Timeline orchestration of multiple tracks
//!
//! The scheduler is cooperative and single-threaded: the host calls
//! [`tick`](AnimationScheduler::tick) once per frame (wall-clock) or
//! [`advance`](AnimationScheduler::advance) with an explicit delta for
//! deterministic stepping. Tick callbacks run after animation state has
//! been updated, with the scheduler lock released so they are free to
//! call back into handles.

use crate::spring::Spring;
use crate::timeline::Timeline;
use crate::tween::Tween;
use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

new_key_type! {
    /// Handle to a registered spring animation
    pub struct SpringId;
    /// Handle to a registered tween
    pub struct TweenId;
    /// Handle to a registered timeline
    pub struct TimelineId;
    /// Handle to a registered tick callback
    pub struct TickCallbackId;
}

/// Per-frame callback run after animations have been stepped
///
/// Receives the frame delta in milliseconds. Return `false` to
/// unregister the callback.
pub type TickCallback = Box<dyn FnMut(f32) -> bool + Send>;

/// Internal state of the animation scheduler
struct SchedulerInner {
    springs: SlotMap<SpringId, Spring>,
    tweens: SlotMap<TweenId, Tween>,
    timelines: SlotMap<TimelineId, Timeline>,
    /// Callbacks are parked as `None` while they run outside the lock
    callbacks: SlotMap<TickCallbackId, Option<TickCallback>>,
    last_frame: Instant,
}

impl SchedulerInner {
    fn step(&mut self, dt_ms: f32) {
        let dt = dt_ms / 1000.0;

        for (_, spring) in self.springs.iter_mut() {
            spring.step(dt);
        }

        for (_, tween) in self.tweens.iter_mut() {
            tween.tick(dt_ms);
        }

        for (_, timeline) in self.timelines.iter_mut() {
            timeline.tick(dt_ms);
        }

        // NOTE: We do NOT remove animations here!
        // Springs, tweens, and timelines are only removed when their
        // wrappers drop. This ensures animations can be restarted after
        // completing.
    }

    fn has_active(&self) -> bool {
        self.springs.iter().any(|(_, s)| !s.is_settled())
            || self.tweens.iter().any(|(_, t)| t.is_playing())
            || self.timelines.iter().any(|(_, t)| t.is_playing())
            || !self.callbacks.is_empty()
    }
}

/// The animation scheduler that ticks all active animations
///
/// This is typically owned by the engine and shared via
/// [`SchedulerHandle`]. Animations register themselves implicitly when
/// created through the wrapper types.
pub struct AnimationScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler").finish_non_exhaustive()
    }
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                springs: SlotMap::with_key(),
                tweens: SlotMap::with_key(),
                timelines: SlotMap::with_key(),
                callbacks: SlotMap::with_key(),
                last_frame: Instant::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Get a handle to this scheduler for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Tick all animations using wall-clock time since the last frame
    ///
    /// Returns true if any animations are still active (need another tick).
    pub fn tick(&self) -> bool {
        let dt_ms = {
            let mut inner = self.lock();
            let now = Instant::now();
            let dt = (now - inner.last_frame).as_secs_f32();
            inner.last_frame = now;
            dt * 1000.0
        };
        self.advance(dt_ms)
    }

    /// Advance all animations by an explicit delta (in milliseconds)
    ///
    /// Deterministic alternative to [`tick`](AnimationScheduler::tick):
    /// the same sequence of deltas always produces the same values.
    /// Returns true if any animations are still active.
    pub fn advance(&self, dt_ms: f32) -> bool {
        let callback_ids: Vec<TickCallbackId> = {
            let mut inner = self.lock();
            // Keep the frame clock current so a later tick() doesn't
            // double-count the time covered by this advance.
            inner.last_frame = Instant::now();
            inner.step(dt_ms);
            inner.callbacks.keys().collect()
        };

        // Run callbacks with the lock released; they may call back into
        // scheduler handles.
        for id in callback_ids {
            let callback = {
                let mut inner = self.lock();
                inner.callbacks.get_mut(id).and_then(|slot| slot.take())
            };
            let Some(mut callback) = callback else {
                continue;
            };

            let keep = callback(dt_ms);

            let mut inner = self.lock();
            if keep {
                // Slot may be gone if the callback unregistered itself.
                if let Some(slot) = inner.callbacks.get_mut(id) {
                    *slot = Some(callback);
                }
            } else {
                inner.callbacks.remove(id);
            }
        }

        self.lock().has_active()
    }

    /// Check if any animations are still active
    pub fn has_active_animations(&self) -> bool {
        self.lock().has_active()
    }

    /// Get the number of registered springs
    pub fn spring_count(&self) -> usize {
        self.lock().springs.len()
    }

    /// Get the number of registered tweens
    pub fn tween_count(&self) -> usize {
        self.lock().tweens.len()
    }

    /// Get the number of registered timelines
    pub fn timeline_count(&self) -> usize {
        self.lock().timelines.len()
    }

    /// Get the number of registered tick callbacks
    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AnimationScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A weak handle to the animation scheduler
///
/// This is passed to components that need to register animations.
/// It won't prevent the scheduler from being dropped; every operation
/// safely no-ops once the scheduler is gone.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    fn with_inner<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SchedulerInner) -> R,
    {
        let Some(inner) = self.inner.upgrade() else {
            tracing::debug!("SchedulerHandle: scheduler dropped, ignoring operation");
            return None;
        };
        let mut guard = match inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(f(&mut guard))
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    // =========================================================================
    // Spring Operations
    // =========================================================================

    /// Register a spring and return its ID
    pub fn register_spring(&self, spring: Spring) -> Option<SpringId> {
        self.with_inner(|inner| {
            // Reset last_frame to now to prevent a huge dt on the first
            // tick after registration.
            inner.last_frame = Instant::now();
            inner.springs.insert(spring)
        })
    }

    /// Update a spring's target
    pub fn set_spring_target(&self, id: SpringId, target: f32) {
        self.with_inner(|inner| {
            if let Some(spring) = inner.springs.get_mut(id) {
                spring.set_target(target);
            }
        });
    }

    /// Get current spring value
    pub fn get_spring_value(&self, id: SpringId) -> Option<f32> {
        self.with_inner(|inner| inner.springs.get(id).map(|s| s.value()))
            .flatten()
    }

    /// Check if a spring has settled (at rest at target)
    ///
    /// Returns `true` if the spring exists and has settled, or if the
    /// spring doesn't exist (nothing left animating).
    pub fn is_spring_settled(&self, id: SpringId) -> bool {
        self.with_inner(|inner| inner.springs.get(id).map(|s| s.is_settled()))
            .flatten()
            .unwrap_or(true)
    }

    /// Remove a spring
    pub fn remove_spring(&self, id: SpringId) {
        self.with_inner(|inner| {
            inner.springs.remove(id);
        });
    }

    // =========================================================================
    // Tween Operations
    // =========================================================================

    /// Register a tween and return its ID
    pub fn register_tween(&self, tween: Tween) -> Option<TweenId> {
        self.with_inner(|inner| {
            inner.last_frame = Instant::now();
            inner.tweens.insert(tween)
        })
    }

    /// Get current tween value
    pub fn get_tween_value(&self, id: TweenId) -> Option<f32> {
        self.with_inner(|inner| inner.tweens.get(id).map(|t| t.value()))
            .flatten()
    }

    /// Check if a tween is playing
    pub fn is_tween_playing(&self, id: TweenId) -> bool {
        self.with_inner(|inner| inner.tweens.get(id).map(|t| t.is_playing()))
            .flatten()
            .unwrap_or(false)
    }

    /// Access a tween to start, reverse, or query it
    ///
    /// Returns None if the scheduler is dropped or the tween doesn't exist.
    pub fn with_tween<F, R>(&self, id: TweenId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Tween) -> R,
    {
        self.with_inner(|inner| inner.tweens.get_mut(id).map(f))
            .flatten()
    }

    /// Remove a tween
    pub fn remove_tween(&self, id: TweenId) {
        self.with_inner(|inner| {
            inner.tweens.remove(id);
        });
    }

    // =========================================================================
    // Timeline Operations
    // =========================================================================

    /// Register a timeline and return its ID
    pub fn register_timeline(&self, timeline: Timeline) -> Option<TimelineId> {
        self.with_inner(|inner| {
            inner.last_frame = Instant::now();
            inner.timelines.insert(timeline)
        })
    }

    /// Check if a timeline is playing
    pub fn is_timeline_playing(&self, id: TimelineId) -> bool {
        self.with_inner(|inner| inner.timelines.get(id).map(|t| t.is_playing()))
            .flatten()
            .unwrap_or(false)
    }

    /// Start a timeline
    pub fn start_timeline(&self, id: TimelineId) {
        self.with_timeline(id, |timeline| timeline.start());
    }

    /// Stop a timeline
    pub fn stop_timeline(&self, id: TimelineId) {
        self.with_timeline(id, |timeline| timeline.stop());
    }

    /// Remove a timeline
    pub fn remove_timeline(&self, id: TimelineId) {
        self.with_inner(|inner| {
            inner.timelines.remove(id);
        });
    }

    /// Access a timeline to add entries or get values
    ///
    /// The closure receives a mutable reference to the timeline.
    /// Returns None if the scheduler is dropped or timeline doesn't exist.
    pub fn with_timeline<F, R>(&self, id: TimelineId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Timeline) -> R,
    {
        self.with_inner(|inner| inner.timelines.get_mut(id).map(f))
            .flatten()
    }

    // =========================================================================
    // Tick Callbacks
    // =========================================================================

    /// Register a per-frame callback
    ///
    /// The callback runs after animation state has been stepped, with
    /// the scheduler lock released. Return `false` from the callback to
    /// unregister it.
    pub fn add_tick_callback(&self, callback: TickCallback) -> Option<TickCallbackId> {
        self.with_inner(|inner| {
            inner.last_frame = Instant::now();
            inner.callbacks.insert(Some(callback))
        })
    }

    /// Remove a tick callback
    pub fn remove_tick_callback(&self, id: TickCallbackId) {
        self.with_inner(|inner| {
            inner.callbacks.remove(id);
        });
    }
}

// ============================================================================
// Animated Spring
// ============================================================================

/// An animated value that automatically registers with the scheduler
///
/// When the target changes, the value smoothly animates to it using
/// spring physics. The spring is registered lazily on the first target
/// change and removed when this wrapper drops.
///
/// # Example
///
/// ```ignore
/// let mut opacity = AnimatedSpring::new(handle, 1.0, SpringConfig::stiff());
/// opacity.set_target(0.0);
/// let current = opacity.get();
/// ```
#[derive(Clone)]
pub struct AnimatedSpring {
    handle: SchedulerHandle,
    spring_id: Option<SpringId>,
    config: crate::spring::SpringConfig,
    /// The last known value (updated when set immediately)
    current: f32,
    /// The target value we're animating towards
    target: f32,
}

impl AnimatedSpring {
    /// Create a new animated value with the given initial value
    pub fn new(handle: SchedulerHandle, initial: f32, config: crate::spring::SpringConfig) -> Self {
        // Don't register immediately - only when we have a target change
        Self {
            handle,
            spring_id: None,
            config,
            current: initial,
            target: initial,
        }
    }

    /// Set the target value - starts animation if different from current
    pub fn set_target(&mut self, target: f32) {
        self.target = target;

        if let Some(id) = self.spring_id {
            self.handle.set_spring_target(id, target);
        } else if (target - self.current).abs() > f32::EPSILON {
            let spring = Spring::new(self.config, self.current);
            if let Some(id) = self.handle.register_spring(spring) {
                self.spring_id = Some(id);
                self.handle.set_spring_target(id, target);
            }
        }
    }

    /// Get the current animated value
    pub fn get(&self) -> f32 {
        if let Some(id) = self.spring_id {
            self.handle.get_spring_value(id).unwrap_or(self.target)
        } else {
            self.current
        }
    }

    /// Set value immediately without animation
    pub fn set_immediate(&mut self, value: f32) {
        if let Some(id) = self.spring_id.take() {
            self.handle.remove_spring(id);
        }
        self.current = value;
        self.target = value;
    }

    /// Check if currently animating
    ///
    /// Returns `true` only while the spring is actively moving toward
    /// its target.
    pub fn is_animating(&self) -> bool {
        match self.spring_id {
            Some(id) => !self.handle.is_spring_settled(id),
            None => false,
        }
    }

    /// Snap immediately to the target value, stopping any active animation
    pub fn snap_to_target(&mut self) {
        self.set_immediate(self.target);
    }

    /// Get the current target value
    pub fn target(&self) -> f32 {
        self.target
    }
}

impl Drop for AnimatedSpring {
    fn drop(&mut self) {
        if let Some(id) = self.spring_id {
            self.handle.remove_spring(id);
        }
    }
}

// ============================================================================
// Animated Tween
// ============================================================================

/// A tween that automatically registers with the scheduler
///
/// The tween is registered on creation and ticked each frame by the
/// scheduler; it is removed when this wrapper drops.
///
/// # Example
///
/// ```ignore
/// let tween = Tween::new(0.0, 1.0, 600).easing(Easing::CubicOut);
/// let anim = AnimatedTween::new(handle, tween);
/// anim.start();
/// let value = anim.value();
/// ```
pub struct AnimatedTween {
    handle: SchedulerHandle,
    tween_id: Option<TweenId>,
    /// Endpoint fallbacks for when the scheduler is gone
    from: f32,
}

impl AnimatedTween {
    /// Register a tween with the scheduler
    pub fn new(handle: SchedulerHandle, tween: Tween) -> Self {
        let from = tween.value();
        let tween_id = handle.register_tween(tween);
        Self {
            handle,
            tween_id,
            from,
        }
    }

    /// Start from the beginning, playing forward with the full delay
    pub fn start(&self) {
        if let Some(id) = self.tween_id {
            self.handle.with_tween(id, |t| t.start());
        }
    }

    /// Continue from the current position in the given direction
    pub fn play(&self, direction: crate::tween::PlayDirection) {
        if let Some(id) = self.tween_id {
            self.handle.with_tween(id, |t| t.play(direction));
        }
    }

    /// Flip playback direction from the current position
    pub fn reverse(&self) {
        if let Some(id) = self.tween_id {
            self.handle.with_tween(id, |t| t.reverse());
        }
    }

    /// Stop without changing position
    pub fn stop(&self) {
        if let Some(id) = self.tween_id {
            self.handle.with_tween(id, |t| t.stop());
        }
    }

    /// Jump to the end of the current direction and stop
    pub fn finish(&self) {
        if let Some(id) = self.tween_id {
            self.handle.with_tween(id, |t| t.finish());
        }
    }

    /// Current interpolated value
    pub fn value(&self) -> f32 {
        self.tween_id
            .and_then(|id| self.handle.get_tween_value(id))
            .unwrap_or(self.from)
    }

    /// Progress along the forward axis (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        self.tween_id
            .and_then(|id| self.handle.with_tween(id, |t| t.progress()))
            .unwrap_or(0.0)
    }

    /// Check if the tween is playing
    pub fn is_playing(&self) -> bool {
        self.tween_id
            .map(|id| self.handle.is_tween_playing(id))
            .unwrap_or(false)
    }
}

impl Drop for AnimatedTween {
    fn drop(&mut self) {
        if let Some(id) = self.tween_id {
            self.handle.remove_tween(id);
        }
    }
}

// ============================================================================
// Animated Timeline
// ============================================================================

/// A timeline animation that automatically registers with the scheduler
///
/// Orchestrates multiple tracks with offsets and looping support.
/// The timeline is automatically registered and ticked by the scheduler.
///
/// # Example
///
/// ```ignore
/// let mut timeline = AnimatedTimeline::new(handle);
///
/// let opacity = timeline.add(0, 500, 0.0, 1.0);     // Fade in from 0-500ms
/// let scale = timeline.add(250, 500, 0.8, 1.0);     // Scale up from 250-750ms
///
/// timeline.start();
/// let value = timeline.get(opacity);
/// ```
pub struct AnimatedTimeline {
    handle: SchedulerHandle,
    timeline_id: Option<TimelineId>,
}

impl AnimatedTimeline {
    /// Create a new timeline animation
    pub fn new(handle: SchedulerHandle) -> Self {
        // Register an empty timeline immediately
        let timeline_id = handle.register_timeline(Timeline::new());
        Self {
            handle,
            timeline_id,
        }
    }

    /// Add a linear track to the timeline
    ///
    /// Returns an entry ID that can be used to get the current value.
    pub fn add(
        &mut self,
        offset_ms: i32,
        duration_ms: u32,
        start_value: f32,
        end_value: f32,
    ) -> Option<crate::timeline::TimelineEntryId> {
        let id = self.timeline_id?;
        self.handle.with_timeline(id, |timeline| {
            timeline.add(offset_ms, duration_ms, start_value, end_value)
        })
    }

    /// Add a track with a specific easing function
    pub fn add_with_easing(
        &mut self,
        offset_ms: i32,
        duration_ms: u32,
        start_value: f32,
        end_value: f32,
        easing: crate::easing::Easing,
    ) -> Option<crate::timeline::TimelineEntryId> {
        let id = self.timeline_id?;
        self.handle.with_timeline(id, |timeline| {
            timeline.add_with_easing(offset_ms, duration_ms, start_value, end_value, easing)
        })
    }

    /// Add a staggered cascade of tracks
    pub fn add_stagger(
        &mut self,
        stagger: &crate::timeline::StaggerBuilder,
        count: usize,
    ) -> Vec<crate::timeline::TimelineEntryId> {
        match self.timeline_id {
            Some(id) => self
                .handle
                .with_timeline(id, |timeline| stagger.add_to(timeline, count))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Set loop count (-1 for infinite)
    pub fn set_loop(&mut self, count: i32) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.set_loop(count);
            });
        }
    }

    /// Enable/disable alternate (ping-pong) mode
    pub fn set_alternate(&mut self, enabled: bool) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.set_alternate(enabled);
            });
        }
    }

    /// Set playback rate (1.0 = normal speed, 2.0 = 2x speed)
    pub fn set_playback_rate(&mut self, rate: f32) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.set_playback_rate(rate);
            });
        }
    }

    /// Start the timeline from the beginning
    pub fn start(&self) {
        if let Some(id) = self.timeline_id {
            self.handle.start_timeline(id);
        }
    }

    /// Stop the timeline
    pub fn stop(&self) {
        if let Some(id) = self.timeline_id {
            self.handle.stop_timeline(id);
        }
    }

    /// Pause the timeline (can be resumed)
    pub fn pause(&self) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.pause();
            });
        }
    }

    /// Resume a paused timeline
    pub fn resume(&self) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.resume();
            });
        }
    }

    /// Reverse the playback direction
    pub fn reverse(&self) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.reverse();
            });
        }
    }

    /// Seek to a specific time position (in milliseconds)
    pub fn seek(&self, time_ms: f32) {
        if let Some(id) = self.timeline_id {
            self.handle.with_timeline(id, |timeline| {
                timeline.seek(time_ms);
            });
        }
    }

    /// Get the current value for a timeline entry
    pub fn get(&self, entry_id: crate::timeline::TimelineEntryId) -> Option<f32> {
        let id = self.timeline_id?;
        self.handle
            .with_timeline(id, |timeline| timeline.value(entry_id))
            .flatten()
    }

    /// Check if the timeline is playing
    pub fn is_playing(&self) -> bool {
        match self.timeline_id {
            Some(id) => self.handle.is_timeline_playing(id),
            None => false,
        }
    }

    /// Get the overall timeline progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        self.timeline_id
            .and_then(|id| self.handle.with_timeline(id, |timeline| timeline.progress()))
            .unwrap_or(0.0)
    }

    /// Get progress of a specific entry (0.0 to 1.0)
    pub fn entry_progress(&self, entry_id: crate::timeline::TimelineEntryId) -> Option<f32> {
        let id = self.timeline_id?;
        self.handle
            .with_timeline(id, |timeline| timeline.entry_progress(entry_id))
            .flatten()
    }

    /// Total duration of the timeline, in milliseconds
    pub fn total_duration_ms(&self) -> f32 {
        self.timeline_id
            .and_then(|id| {
                self.handle
                    .with_timeline(id, |timeline| timeline.total_duration_ms())
            })
            .unwrap_or(0.0)
    }

    /// Check if the timeline has any entries
    pub fn has_entries(&self) -> bool {
        self.timeline_id
            .and_then(|id| {
                self.handle
                    .with_timeline(id, |timeline| timeline.entry_count() > 0)
            })
            .unwrap_or(false)
    }
}

impl Drop for AnimatedTimeline {
    fn drop(&mut self) {
        if let Some(id) = self.timeline_id {
            self.handle.remove_timeline(id);
        }
    }
}
