//! Sequenced intro overlay
//!
//! A landing intro plays counter, logo, and tagline phases on one
//! timeline, fades the overlay out, and hands the page over exactly
//! once. Phase order is enforced by a forward-only state machine, so
//! no tick ordering or duplicate event can move the intro backwards.
//!
//! Three drive modes, decided at mount:
//! - full motion with a scheduler: one timeline carries every entry;
//! - reduced capability with a scheduler: content snaps in and the
//!   overlay holds for `reduced_hold_ms` before handing over;
//! - no scheduler: the host pumps [`IntroController::update`] and the
//!   same coarse schedule runs, so the page is never blocked behind
//!   a missing animation backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use unveil_animation::{Easing, SchedulerHandle, TickCallbackId, Timeline, TimelineId};
use unveil_core::{CapabilityService, CompletionGate, EventId, StateId, StateMachine};

use crate::engine::Engine;
use crate::settings::IntroTimings;
use crate::stage::{NodeId, Stage};

const ST_IDLE: StateId = 0;
const ST_COUNTER: StateId = 1;
const ST_LOGO: StateId = 2;
const ST_TAGLINE: StateId = 3;
const ST_EXITING: StateId = 4;
const ST_COMPLETE: StateId = 5;

const EV_START: EventId = 0;
const EV_LOGO: EventId = 1;
const EV_TAGLINE: EventId = 2;
const EV_EXIT: EventId = 3;
const EV_FINISH: EventId = 4;

/// Duration of the logo and tagline fade entries
const INTRO_FADE_MS: u32 = 600;

/// Where the intro currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntroPhase {
    Idle,
    CounterRunning,
    LogoRevealing,
    TaglineRevealing,
    Exiting,
    Complete,
}

fn phase_of(state: StateId) -> IntroPhase {
    match state {
        ST_IDLE => IntroPhase::Idle,
        ST_COUNTER => IntroPhase::CounterRunning,
        ST_LOGO => IntroPhase::LogoRevealing,
        ST_TAGLINE => IntroPhase::TaglineRevealing,
        ST_EXITING => IntroPhase::Exiting,
        _ => IntroPhase::Complete,
    }
}

fn forward_chain() -> StateMachine {
    StateMachine::builder(ST_IDLE)
        .on(ST_IDLE, EV_START, ST_COUNTER)
        .on(ST_COUNTER, EV_LOGO, ST_LOGO)
        .on(ST_LOGO, EV_TAGLINE, ST_TAGLINE)
        .on(ST_TAGLINE, EV_EXIT, ST_EXITING)
        .on(ST_EXITING, EV_FINISH, ST_COMPLETE)
        .build()
}

struct IntroShared {
    machine: StateMachine,
    elapsed_ms: f32,
    counter: f32,
    logo: f32,
    tagline: f32,
    on_complete: Option<Box<dyn FnOnce() + Send>>,
}

fn lock(shared: &Mutex<IntroShared>) -> MutexGuard<'_, IntroShared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Advance the coarse (no-timeline) schedule by `dt_ms`
///
/// Returns `false` once the intro has completed. Shared by the
/// reduced-capability tick callback and the host-driven update path.
fn coarse_step(
    shared: &Mutex<IntroShared>,
    timings: IntroTimings,
    dt_ms: f32,
    stage: &Stage,
    overlay: NodeId,
    gate: &CompletionGate,
    alive: &AtomicBool,
) -> bool {
    if !alive.load(Ordering::SeqCst) {
        return false;
    }
    let exit_at = timings.reduced_hold_ms as f32;
    let finish_at = exit_at + timings.exit_ms as f32;

    let mut s = lock(shared);
    s.elapsed_ms += dt_ms;
    if s.elapsed_ms >= exit_at {
        s.machine.send(EV_EXIT);
    }
    if s.elapsed_ms >= finish_at {
        s.machine.send(EV_FINISH);
        let on_complete = s.on_complete.take();
        drop(s);
        alive.store(false, Ordering::SeqCst);
        if gate.complete() {
            stage.detach(overlay);
            if let Some(callback) = on_complete {
                callback();
            }
        }
        return false;
    }
    true
}

/// Owner of a mounted intro
///
/// Dropping the controller before completion cancels the remaining
/// schedule; `on_complete` is then dropped unrun and the gate never
/// latches.
pub struct IntroController {
    alive: Arc<AtomicBool>,
    gate: CompletionGate,
    shared: Arc<Mutex<IntroShared>>,
    stage: Stage,
    overlay: NodeId,
    timings: IntroTimings,
    scheduler: Option<SchedulerHandle>,
    timeline: Option<TimelineId>,
    tick: Option<TickCallbackId>,
    host_driven: bool,
}

impl IntroController {
    /// Mount the intro over `overlay`
    ///
    /// The overlay node stays attached until the intro completes, at
    /// which point it is detached and `on_complete` runs exactly once.
    pub fn mount(
        engine: &Engine,
        stage: &Stage,
        overlay: NodeId,
        timings: IntroTimings,
        capabilities: &CapabilityService,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Self {
        let mut machine = forward_chain();
        machine.send(EV_START);

        let coarse = capabilities.is_reduced() || !engine.is_enhanced();
        let (counter, logo, tagline) = if coarse {
            // Content snaps in; only the hold and hand-over remain.
            machine.send(EV_LOGO);
            machine.send(EV_TAGLINE);
            (100.0, 1.0, 1.0)
        } else {
            (0.0, 0.0, 0.0)
        };

        let shared = Arc::new(Mutex::new(IntroShared {
            machine,
            elapsed_ms: 0.0,
            counter,
            logo,
            tagline,
            on_complete: Some(Box::new(on_complete)),
        }));

        let mut controller = Self {
            alive: Arc::new(AtomicBool::new(true)),
            gate: CompletionGate::new(),
            shared,
            stage: stage.clone(),
            overlay,
            timings,
            scheduler: None,
            timeline: None,
            tick: None,
            host_driven: false,
        };

        let Some(scheduler) = engine.handle() else {
            controller.host_driven = true;
            return controller;
        };

        if coarse {
            controller.mount_coarse(scheduler);
        } else {
            controller.mount_timeline(scheduler);
        }
        controller
    }

    fn mount_coarse(&mut self, scheduler: SchedulerHandle) {
        let shared = self.shared.clone();
        let stage = self.stage.clone();
        let gate = self.gate.clone();
        let alive = self.alive.clone();
        let overlay = self.overlay;
        let timings = self.timings;
        self.tick = scheduler.add_tick_callback(Box::new(move |dt| {
            coarse_step(&shared, timings, dt, &stage, overlay, &gate, &alive)
        }));
        self.scheduler = Some(scheduler);
        if self.tick.is_none() {
            self.host_driven = true;
        }
    }

    fn mount_timeline(&mut self, scheduler: SchedulerHandle) {
        let timings = self.timings;
        let counter_end = timings.counter_ms as f32;
        let finish_at = counter_end + timings.exit_ms as f32;

        let mut timeline = Timeline::new();
        let counter_entry = timeline.add(0, timings.counter_ms, 0.0, 100.0);
        let logo_entry = timeline.add_with_easing(
            timings.logo_offset_ms as i32,
            INTRO_FADE_MS,
            0.0,
            1.0,
            Easing::EaseOut,
        );
        let tagline_entry = timeline.add_with_easing(
            timings.tagline_offset_ms as i32,
            INTRO_FADE_MS,
            0.0,
            1.0,
            Easing::EaseOut,
        );
        let exit_entry = timeline.add(timings.counter_ms as i32, timings.exit_ms, 0.0, 1.0);
        timeline.start();

        let Some(timeline_id) = scheduler.register_timeline(timeline) else {
            self.host_driven = true;
            return;
        };

        let shared = self.shared.clone();
        let stage = self.stage.clone();
        let gate = self.gate.clone();
        let alive = self.alive.clone();
        let overlay = self.overlay;
        let tick_sched = scheduler.clone();
        self.tick = scheduler.add_tick_callback(Box::new(move |dt| {
            if !alive.load(Ordering::SeqCst) {
                return false;
            }
            let values = tick_sched.with_timeline(timeline_id, |t| {
                (
                    t.value(counter_entry),
                    t.value(logo_entry),
                    t.value(tagline_entry),
                    t.value(exit_entry),
                )
            });
            let Some((counter, logo, tagline, exit)) = values else {
                return false;
            };

            let mut s = lock(&shared);
            s.elapsed_ms += dt;
            if let Some(value) = counter {
                s.counter = value;
            }
            if let Some(value) = logo {
                s.logo = value;
            }
            if let Some(value) = tagline {
                s.tagline = value;
            }
            if s.elapsed_ms >= timings.logo_offset_ms as f32 {
                s.machine.send(EV_LOGO);
            }
            if s.elapsed_ms >= timings.tagline_offset_ms as f32 {
                s.machine.send(EV_TAGLINE);
            }
            if s.elapsed_ms >= counter_end {
                s.machine.send(EV_EXIT);
            }

            if let Some(progress) = exit {
                stage.update_style(overlay, |style| style.opacity = 1.0 - progress);
            }

            if s.elapsed_ms >= finish_at {
                s.machine.send(EV_FINISH);
                let on_complete = s.on_complete.take();
                drop(s);
                alive.store(false, Ordering::SeqCst);
                tick_sched.remove_timeline(timeline_id);
                if gate.complete() {
                    stage.detach(overlay);
                    if let Some(callback) = on_complete {
                        callback();
                    }
                }
                return false;
            }
            true
        }));
        self.timeline = Some(timeline_id);
        self.scheduler = Some(scheduler);
        if self.tick.is_none() {
            self.host_driven = true;
        }
    }

    /// Current phase
    pub fn phase(&self) -> IntroPhase {
        phase_of(lock(&self.shared).machine.current())
    }

    /// The counter rendered zero-padded three wide, "000" through "100"
    pub fn counter_display(&self) -> String {
        let value = lock(&self.shared).counter;
        format!("{:03}", value.round().clamp(0.0, 100.0) as u32)
    }

    /// Logo fade progress, 0 to 1
    pub fn logo_progress(&self) -> f32 {
        lock(&self.shared).logo
    }

    /// Tagline fade progress, 0 to 1
    pub fn tagline_progress(&self) -> f32 {
        lock(&self.shared).tagline
    }

    pub fn is_complete(&self) -> bool {
        self.gate.is_complete()
    }

    /// Host-driven frame pump for scheduler-less embeddings
    ///
    /// No-op when a scheduler is driving the intro.
    pub fn update(&self, dt_ms: f32) {
        if !self.host_driven {
            return;
        }
        coarse_step(
            &self.shared,
            self.timings,
            dt_ms,
            &self.stage,
            self.overlay,
            &self.gate,
            &self.alive,
        );
    }

    /// Cancel the intro if it has not completed
    pub fn release(self) {}

    fn cancel(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(scheduler) = &self.scheduler {
            if let Some(id) = self.tick.take() {
                scheduler.remove_tick_callback(id);
            }
            if let Some(id) = self.timeline.take() {
                scheduler.remove_timeline(id);
            }
        }
    }
}

impl Drop for IntroController {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use std::sync::atomic::AtomicUsize;
    use unveil_animation::AnimationScheduler;
    use unveil_core::{EnvironmentProbe, PointerClass, Vec2};

    struct FakeProbe {
        pointer: Option<PointerClass>,
        viewport: Option<Vec2>,
    }

    impl EnvironmentProbe for FakeProbe {
        fn pointer_class(&self) -> Option<PointerClass> {
            self.pointer
        }

        fn touch_points(&self) -> Option<u32> {
            Some(0)
        }

        fn viewport_size(&self) -> Option<Vec2> {
            self.viewport
        }
    }

    fn full_motion() -> CapabilityService {
        CapabilityService::new(&FakeProbe {
            pointer: Some(PointerClass::Fine),
            viewport: Some(Vec2::new(1440.0, 900.0)),
        })
    }

    fn reduced_motion() -> CapabilityService {
        CapabilityService::new(&FakeProbe {
            pointer: Some(PointerClass::Coarse),
            viewport: Some(Vec2::new(390.0, 844.0)),
        })
    }

    fn short_timings() -> IntroTimings {
        IntroTimings {
            counter_ms: 1000,
            logo_offset_ms: 100,
            tagline_offset_ms: 300,
            exit_ms: 200,
            reduced_hold_ms: 400,
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_phases_advance_in_order() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );
        assert_eq!(intro.phase(), IntroPhase::CounterRunning);
        assert_eq!(intro.counter_display(), "000");

        scheduler.advance(116.0);
        assert_eq!(intro.phase(), IntroPhase::LogoRevealing);
        assert!(intro.logo_progress() > 0.0);

        scheduler.advance(200.0);
        assert_eq!(intro.phase(), IntroPhase::TaglineRevealing);
        assert_eq!(intro.counter_display(), "032");

        scheduler.advance(700.0);
        assert_eq!(intro.phase(), IntroPhase::Exiting);
        assert_eq!(intro.counter_display(), "100");
        assert!(stage.style(overlay).unwrap().opacity < 1.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(200.0);
        assert_eq!(intro.phase(), IntroPhase::Complete);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(intro.is_complete());
        assert!(!stage.is_attached(overlay));
        assert_eq!(scheduler.timeline_count(), 0);
        assert_eq!(scheduler.callback_count(), 0);
    }

    #[test]
    fn test_completion_waits_for_full_exit() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );

        // Counter done at 1000ms but the exit still has 100ms to run
        scheduler.advance(1100.0);
        assert_eq!(intro.phase(), IntroPhase::Exiting);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!intro.is_complete());

        scheduler.advance(100.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Nothing left to fire a second time
        scheduler.advance(1000.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(intro.phase(), IntroPhase::Complete);
    }

    #[test]
    fn test_phases_never_regress() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            || {},
        );

        let mut last = intro.phase();
        for _ in 0..100 {
            scheduler.advance(16.0);
            let phase = intro.phase();
            assert!(phase >= last);
            last = phase;
        }
        assert_eq!(last, IntroPhase::Complete);
        scheduler.advance(500.0);
        assert_eq!(intro.phase(), IntroPhase::Complete);
    }

    #[test]
    fn test_one_advance_spanning_everything() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );

        // A single giant frame walks the whole chain in order
        scheduler.advance(5000.0);
        assert_eq!(intro.phase(), IntroPhase::Complete);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!stage.is_attached(overlay));
    }

    #[test]
    fn test_reduced_runs_coarse_schedule() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &reduced_motion(),
            callback,
        );
        assert_eq!(intro.phase(), IntroPhase::TaglineRevealing);
        assert_eq!(intro.counter_display(), "100");
        assert_eq!(scheduler.timeline_count(), 0);

        scheduler.advance(400.0);
        assert_eq!(intro.phase(), IntroPhase::Exiting);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(200.0);
        assert_eq!(intro.phase(), IntroPhase::Complete);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!stage.is_attached(overlay));
    }

    #[test]
    fn test_baseline_is_host_driven() {
        let engine = Engine::baseline();
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );
        assert_eq!(intro.counter_display(), "100");

        intro.update(300.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        intro.update(300.0);
        assert_eq!(intro.phase(), IntroPhase::Complete);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!stage.is_attached(overlay));
    }

    #[test]
    fn test_drop_before_completion_cancels() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );
        scheduler.advance(500.0);
        intro.release();

        assert_eq!(scheduler.timeline_count(), 0);
        assert_eq!(scheduler.callback_count(), 0);
        scheduler.advance(2000.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(stage.is_attached(overlay));
    }

    #[test]
    fn test_update_is_inert_when_scheduler_driven() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let overlay = stage.create_node();
        let (fired, callback) = counting_callback();

        let intro = IntroController::mount(
            &engine,
            &stage,
            overlay,
            short_timings(),
            &full_motion(),
            callback,
        );
        intro.update(10_000.0);
        assert_eq!(intro.phase(), IntroPhase::CounterRunning);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
