//! Scroll-triggered reveal
//!
//! A reveal holds a node at a hidden style (offset, scaled, faded)
//! until its threshold line is crossed, then animates every channel to
//! the resting style. The capability check comes first: reduced-motion
//! environments get the resting style at mount and the engine is never
//! touched. A `Baseline` engine resolves the same way, so content can
//! never end up stuck hidden.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;
use unveil_animation::{
    Easing, PlayDirection, SchedulerHandle, Spring, SpringConfig, SpringId, TickCallbackId, Tween,
    TweenId,
};
use unveil_core::{CapabilityService, Vec2};

use crate::engine::Engine;
use crate::stage::{NodeId, NodeStyle, Stage, Threshold, WatcherEvent, WatcherId};

/// What drives the hidden→rest progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionDriver {
    /// Fixed-duration eased tween
    Tween,
    /// Spring physics; duration is emergent from the config
    Spring(SpringConfig),
}

impl Default for MotionDriver {
    fn default() -> Self {
        Self::Tween
    }
}

/// Shape of a reveal motion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSpec {
    /// Hidden translate offset, animated back to zero
    pub offset: Vec2,
    /// Hidden scale, must be positive
    pub scale: f32,
    /// Hidden opacity, must be in `[0, 1)`
    pub opacity: f32,
    pub duration_ms: u32,
    pub delay_ms: u32,
    pub easing: Easing,
    pub threshold: Threshold,
    /// Reverse back to hidden when the node leaves the threshold
    pub repeatable: bool,
    pub driver: MotionDriver,
}

impl Default for MotionSpec {
    fn default() -> Self {
        Self {
            offset: Vec2::new(0.0, 24.0),
            scale: 1.0,
            opacity: 0.0,
            duration_ms: 600,
            delay_ms: 0,
            easing: Easing::EaseOut,
            threshold: Threshold::top(0.85),
            repeatable: false,
            driver: MotionDriver::Tween,
        }
    }
}

impl MotionSpec {
    /// Replace out-of-range fields with their defaults
    pub(crate) fn sanitized(mut self) -> Self {
        if !(0.0..1.0).contains(&self.opacity) {
            warn!("hidden opacity {} out of [0, 1), using 0.0", self.opacity);
            self.opacity = 0.0;
        }
        if self.duration_ms == 0 {
            warn!("reveal duration must be positive, using 600ms");
            self.duration_ms = 600;
        }
        if self.scale <= 0.0 {
            warn!("hidden scale {} must be positive, using 1.0", self.scale);
            self.scale = 1.0;
        }
        self
    }

    pub(crate) fn hidden_style(&self) -> NodeStyle {
        NodeStyle {
            opacity: self.opacity,
            translate: self.offset,
            scale: self.scale,
        }
    }
}

/// Blend hidden→rest at eased progress `p`
///
/// Exact at both endpoints so completed motions land on the precise
/// hidden/resting styles; spring overshoot (`p > 1`) passes through the
/// blend so translate and scale can wobble past rest while opacity
/// stays pinned.
pub(crate) fn blended(hidden: &NodeStyle, p: f32) -> NodeStyle {
    if p == 1.0 {
        return NodeStyle::resting();
    }
    if p == 0.0 {
        return *hidden;
    }
    NodeStyle {
        opacity: (hidden.opacity + (1.0 - hidden.opacity) * p).clamp(0.0, 1.0),
        translate: hidden.translate * (1.0 - p),
        scale: hidden.scale + (1.0 - hidden.scale) * p,
    }
}

/// Owner of a mounted reveal
///
/// Dropping (or explicitly releasing) the handle cancels the watcher
/// and any in-flight animation; nothing mutates the node afterwards.
#[derive(Default)]
pub struct RevealHandle {
    alive: Arc<AtomicBool>,
    stage: Option<Stage>,
    scheduler: Option<SchedulerHandle>,
    watcher: Option<WatcherId>,
    tween: Option<TweenId>,
    spring: Option<SpringId>,
    tick: Option<TickCallbackId>,
}

impl RevealHandle {
    fn inert() -> Self {
        Self::default()
    }

    /// Whether the reveal still owns live registrations
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Cancel the reveal
    pub fn release(self) {}

    fn cancel(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            if let Some(stage) = &self.stage {
                stage.unwatch(watcher);
            }
        }
        if let Some(scheduler) = &self.scheduler {
            if let Some(id) = self.tween.take() {
                scheduler.remove_tween(id);
            }
            if let Some(id) = self.spring.take() {
                scheduler.remove_spring(id);
            }
            if let Some(id) = self.tick.take() {
                scheduler.remove_tick_callback(id);
            }
        }
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Mount a reveal on a node
///
/// Reduced capability or a `Baseline` engine resolve to the resting
/// style immediately. On the enhanced path the node is hidden before
/// the watcher is registered, so there is no frame where unstyled
/// content could show.
pub fn reveal(
    engine: &Engine,
    stage: &Stage,
    node: NodeId,
    spec: MotionSpec,
    capabilities: &CapabilityService,
) -> RevealHandle {
    let spec = spec.sanitized();

    if capabilities.is_reduced() {
        stage.set_style(node, NodeStyle::resting());
        return RevealHandle::inert();
    }
    let Some(scheduler) = engine.handle() else {
        stage.set_style(node, NodeStyle::resting());
        return RevealHandle::inert();
    };

    let hidden = spec.hidden_style();
    stage.set_style(node, hidden);

    let alive = Arc::new(AtomicBool::new(true));
    let mut handle = RevealHandle {
        alive: alive.clone(),
        stage: Some(stage.clone()),
        scheduler: Some(scheduler.clone()),
        ..Default::default()
    };

    match spec.driver {
        MotionDriver::Tween => {
            let tween = Tween::new(0.0, 1.0, spec.duration_ms)
                .easing(spec.easing)
                .delay(spec.delay_ms);
            let Some(tween_id) = scheduler.register_tween(tween) else {
                stage.set_style(node, NodeStyle::resting());
                return RevealHandle::inert();
            };
            handle.tween = Some(tween_id);

            let applier_stage = stage.clone();
            let applier_sched = scheduler.clone();
            let applier_alive = alive.clone();
            handle.tick = scheduler.add_tick_callback(Box::new(move |_dt| {
                if !applier_alive.load(Ordering::SeqCst) {
                    return false;
                }
                let Some(p) = applier_sched.get_tween_value(tween_id) else {
                    return false;
                };
                applier_stage.set_style(node, blended(&hidden, p));
                true
            }));

            let watcher_sched = scheduler.clone();
            let started = Arc::new(AtomicBool::new(false));
            handle.watcher = stage.watch(node, spec.threshold, spec.repeatable, move |event| {
                match event {
                    WatcherEvent::Enter => {
                        if !started.swap(true, Ordering::SeqCst) {
                            watcher_sched.with_tween(tween_id, |t| t.start());
                        } else {
                            watcher_sched.with_tween(tween_id, |t| t.play(PlayDirection::Forward));
                        }
                    }
                    WatcherEvent::Exit => {
                        watcher_sched.with_tween(tween_id, |t| t.play(PlayDirection::Reverse));
                    }
                }
            });
        }
        MotionDriver::Spring(config) => {
            let Some(spring_id) = scheduler.register_spring(Spring::new(config, 0.0)) else {
                stage.set_style(node, NodeStyle::resting());
                return RevealHandle::inert();
            };
            handle.spring = Some(spring_id);

            // Delay before the spring is armed toward rest
            let pending: Arc<Mutex<Option<f32>>> = Arc::new(Mutex::new(None));

            let applier_stage = stage.clone();
            let applier_sched = scheduler.clone();
            let applier_alive = alive.clone();
            let applier_pending = pending.clone();
            handle.tick = scheduler.add_tick_callback(Box::new(move |dt_ms| {
                if !applier_alive.load(Ordering::SeqCst) {
                    return false;
                }
                let arm = {
                    let mut slot = match applier_pending.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    match slot.as_mut() {
                        Some(left) => {
                            *left -= dt_ms;
                            let ready = *left <= 0.0;
                            if ready {
                                *slot = None;
                            }
                            ready
                        }
                        None => false,
                    }
                };
                if arm {
                    applier_sched.set_spring_target(spring_id, 1.0);
                }
                let Some(p) = applier_sched.get_spring_value(spring_id) else {
                    return false;
                };
                applier_stage.set_style(node, blended(&hidden, p));
                true
            }));

            let watcher_sched = scheduler.clone();
            let delay_ms = spec.delay_ms;
            handle.watcher = stage.watch(node, spec.threshold, spec.repeatable, move |event| {
                let mut slot = match pending.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match event {
                    WatcherEvent::Enter => {
                        if delay_ms > 0 {
                            *slot = Some(delay_ms as f32);
                        } else {
                            watcher_sched.set_spring_target(spring_id, 1.0);
                        }
                    }
                    WatcherEvent::Exit => {
                        *slot = None;
                        watcher_sched.set_spring_target(spring_id, 0.0);
                    }
                }
            });
        }
    }

    if handle.watcher.is_none() {
        // Node vanished between the style write and registration
        handle.cancel();
        return RevealHandle::inert();
    }
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use unveil_animation::AnimationScheduler;
    use unveil_core::{Bounds, EnvironmentProbe, PointerClass};

    struct FakeProbe {
        pointer: Option<PointerClass>,
        touch: Option<u32>,
        viewport: Option<Vec2>,
    }

    impl FakeProbe {
        fn desktop() -> Self {
            Self {
                pointer: Some(PointerClass::Fine),
                touch: Some(0),
                viewport: Some(Vec2::new(1440.0, 900.0)),
            }
        }

        fn phone() -> Self {
            Self {
                pointer: Some(PointerClass::Coarse),
                touch: Some(5),
                viewport: Some(Vec2::new(390.0, 844.0)),
            }
        }
    }

    impl EnvironmentProbe for FakeProbe {
        fn pointer_class(&self) -> Option<PointerClass> {
            self.pointer
        }

        fn touch_points(&self) -> Option<u32> {
            self.touch
        }

        fn viewport_size(&self) -> Option<Vec2> {
            self.viewport
        }
    }

    fn full_motion() -> CapabilityService {
        CapabilityService::new(&FakeProbe::desktop())
    }

    fn reduced_motion() -> CapabilityService {
        CapabilityService::new(&FakeProbe::phone())
    }

    fn below_fold_node(stage: &Stage) -> NodeId {
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 50.0));
        node
    }

    #[test]
    fn test_reduced_capability_rests_immediately() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let handle = reveal(&engine, &stage, node, MotionSpec::default(), &reduced_motion());

        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
        assert_eq!(stage.watcher_count(), 0);
        assert_eq!(scheduler.tween_count(), 0);
        assert_eq!(scheduler.callback_count(), 0);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_baseline_engine_rests_immediately() {
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let handle = reveal(
            &Engine::baseline(),
            &stage,
            node,
            MotionSpec::default(),
            &full_motion(),
        );

        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
        assert_eq!(stage.watcher_count(), 0);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_enhanced_hides_then_reveals() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let spec = MotionSpec::default();
        let _handle = reveal(&engine, &stage, node, spec, &full_motion());

        let style = stage.style(node).unwrap();
        assert_eq!(style.opacity, 0.0);
        assert_eq!(style.translate, Vec2::new(0.0, 24.0));

        // Mid-flight after the trigger
        stage.set_scroll(500.0);
        scheduler.advance(300.0);
        let style = stage.style(node).unwrap();
        assert!(style.opacity > 0.0 && style.opacity < 1.0);

        // Completion lands exactly on the resting style
        scheduler.advance(400.0);
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
    }

    #[test]
    fn test_delay_holds_hidden_style() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let spec = MotionSpec {
            delay_ms: 200,
            ..Default::default()
        };
        let _handle = reveal(&engine, &stage, node, spec, &full_motion());

        stage.set_scroll(500.0);
        scheduler.advance(100.0);
        assert_eq!(stage.style(node).unwrap().opacity, 0.0);

        scheduler.advance(800.0);
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
    }

    #[test]
    fn test_repeatable_round_trip_is_exact() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let spec = MotionSpec {
            repeatable: true,
            easing: Easing::CubicOut,
            ..Default::default()
        };
        let hidden = spec.hidden_style();
        let _handle = reveal(&engine, &stage, node, spec, &full_motion());

        // In
        stage.set_scroll(500.0);
        scheduler.advance(700.0);
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));

        // Out: reverses back to exactly the hidden style
        stage.set_scroll(0.0);
        scheduler.advance(700.0);
        assert_eq!(stage.style(node), Some(hidden));

        // In again: exactly the resting style, no drift
        stage.set_scroll(500.0);
        scheduler.advance(700.0);
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
    }

    #[test]
    fn test_spring_driver_settles_at_rest() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let spec = MotionSpec {
            driver: MotionDriver::Spring(SpringConfig::stiff()),
            ..Default::default()
        };
        let _handle = reveal(&engine, &stage, node, spec, &full_motion());

        stage.set_scroll(500.0);
        for _ in 0..200 {
            scheduler.advance(16.0);
        }
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
    }

    #[test]
    fn test_release_cancels_everything() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        let node = below_fold_node(&stage);

        let handle = reveal(&engine, &stage, node, MotionSpec::default(), &full_motion());
        assert!(handle.is_active());
        handle.release();

        assert_eq!(stage.watcher_count(), 0);
        assert_eq!(scheduler.tween_count(), 0);
        assert_eq!(scheduler.callback_count(), 0);

        // Neither scroll nor ticks mutate the node afterwards
        stage.set_scroll(500.0);
        scheduler.advance(700.0);
        assert_eq!(stage.style(node).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_detached_node_defers_until_attach() {
        let scheduler = AnimationScheduler::new();
        let engine = Engine::enhanced(scheduler.clone());
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 100.0, 800.0, 50.0));
        stage.detach(node);

        let _handle = reveal(&engine, &stage, node, MotionSpec::default(), &full_motion());
        assert_eq!(stage.style(node).unwrap().opacity, 0.0);

        scheduler.advance(700.0);
        assert_eq!(stage.style(node).unwrap().opacity, 0.0);

        // Attaching replays the registration; the node is in view
        stage.attach(node);
        scheduler.advance(700.0);
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));
    }

    #[test]
    fn test_sanitize_rejects_bad_fields() {
        let spec = MotionSpec {
            opacity: 1.5,
            duration_ms: 0,
            scale: -2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(spec.opacity, 0.0);
        assert_eq!(spec.duration_ms, 600);
        assert_eq!(spec.scale, 1.0);
    }
}
