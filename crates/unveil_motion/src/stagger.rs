//! Staggered child reveal
//!
//! One watcher on a container; when it fires, every direct child runs
//! the hidden→rest motion with an extra delay of `index * step`. The
//! cascade rides a single timeline built through [`StaggerBuilder`],
//! so the per-child delays are exact. Children added after mount are
//! not retroactively animated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use unveil_animation::{
    SchedulerHandle, StaggerBuilder, TickCallbackId, Timeline, TimelineEntryId, TimelineId,
};
use unveil_core::CapabilityService;

use crate::engine::Engine;
use crate::reveal::{blended, MotionSpec};
use crate::stage::{NodeId, NodeStyle, Stage, WatcherEvent, WatcherId};

/// Owner of a mounted stagger cascade
#[derive(Default)]
pub struct StaggerHandle {
    alive: Arc<AtomicBool>,
    stage: Option<Stage>,
    scheduler: Option<SchedulerHandle>,
    watcher: Option<WatcherId>,
    timeline: Option<TimelineId>,
    tick: Option<TickCallbackId>,
}

impl StaggerHandle {
    fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Cancel the cascade
    pub fn release(self) {}

    fn cancel(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            if let Some(stage) = &self.stage {
                stage.unwatch(watcher);
            }
        }
        if let Some(scheduler) = &self.scheduler {
            if let Some(id) = self.timeline.take() {
                scheduler.remove_timeline(id);
            }
            if let Some(id) = self.tick.take() {
                scheduler.remove_tick_callback(id);
            }
        }
    }
}

impl Drop for StaggerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Mount a staggered reveal over a container's direct children
///
/// The child set is snapshotted here. The container watcher is always
/// one-shot: the cascade plays forward once. `spec.driver` is ignored;
/// the cascade is timeline-driven.
pub fn stagger_reveal(
    engine: &Engine,
    stage: &Stage,
    container: NodeId,
    spec: MotionSpec,
    stagger_step_ms: u32,
    capabilities: &CapabilityService,
) -> StaggerHandle {
    let spec = spec.sanitized();
    let children = stage.children(container);

    if capabilities.is_reduced() {
        for &child in &children {
            stage.set_style(child, NodeStyle::resting());
        }
        return StaggerHandle::inert();
    }
    let Some(scheduler) = engine.handle() else {
        for &child in &children {
            stage.set_style(child, NodeStyle::resting());
        }
        return StaggerHandle::inert();
    };
    if children.is_empty() {
        return StaggerHandle::inert();
    }

    let hidden = spec.hidden_style();
    for &child in &children {
        stage.set_style(child, hidden);
    }

    let mut timeline = Timeline::new();
    let entries = StaggerBuilder::new()
        .offset(spec.delay_ms as i32)
        .step(stagger_step_ms)
        .duration(spec.duration_ms)
        .values(0.0, 1.0)
        .easing(spec.easing)
        .add_to(&mut timeline, children.len());
    let Some(timeline_id) = scheduler.register_timeline(timeline) else {
        return StaggerHandle::inert();
    };

    let alive = Arc::new(AtomicBool::new(true));
    let started = Arc::new(AtomicBool::new(false));

    let pairs: Vec<(TimelineEntryId, NodeId)> = entries.into_iter().zip(children).collect();

    let applier_stage = stage.clone();
    let applier_sched = scheduler.clone();
    let applier_alive = alive.clone();
    let applier_started = started.clone();
    let tick = scheduler.add_tick_callback(Box::new(move |_dt| {
        if !applier_alive.load(Ordering::SeqCst) {
            return false;
        }
        let values: Option<Vec<Option<f32>>> = applier_sched.with_timeline(timeline_id, |t| {
            pairs.iter().map(|&(entry, _)| t.value(entry)).collect()
        });
        let Some(values) = values else {
            return false;
        };
        for (&(_, child), value) in pairs.iter().zip(values) {
            if let Some(p) = value {
                applier_stage.set_style(child, blended(&hidden, p));
            }
        }
        // Once the cascade has fully played there is nothing left to drive
        let done = applier_started.load(Ordering::SeqCst)
            && !applier_sched.is_timeline_playing(timeline_id);
        !done
    }));

    let watcher_sched = scheduler.clone();
    let watcher = stage.watch(container, spec.threshold, false, move |event| {
        if event == WatcherEvent::Enter {
            started.store(true, Ordering::SeqCst);
            watcher_sched.start_timeline(timeline_id);
        }
    });

    let mut handle = StaggerHandle {
        alive,
        stage: Some(stage.clone()),
        scheduler: Some(scheduler),
        watcher,
        timeline: Some(timeline_id),
        tick,
    };
    if handle.watcher.is_none() {
        handle.cancel();
        return StaggerHandle::inert();
    }
    handle
}
