//! Continuous marquee drift
//!
//! One looping timeline moves a node's `translate.x` from 0 to
//! `-span_px` over a cycle, wrapping forever. Reduced capability or a
//! baseline engine leaves the node static and registers nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;
use unveil_animation::{SchedulerHandle, TickCallbackId, Timeline, TimelineId};
use unveil_core::CapabilityService;

use crate::engine::Engine;
use crate::stage::{NodeId, Stage};

/// Owner of a running marquee loop
///
/// Dropping the handle stops the loop and resets the node's horizontal
/// drift to zero.
#[derive(Default)]
pub struct MarqueeHandle {
    alive: Arc<AtomicBool>,
    stage: Option<Stage>,
    scheduler: Option<SchedulerHandle>,
    node: Option<NodeId>,
    timeline: Option<TimelineId>,
    tick: Option<TickCallbackId>,
}

impl MarqueeHandle {
    fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop the loop
    pub fn release(self) {}

    fn cancel(&mut self) {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        if let Some(scheduler) = &self.scheduler {
            if let Some(id) = self.tick.take() {
                scheduler.remove_tick_callback(id);
            }
            if let Some(id) = self.timeline.take() {
                scheduler.remove_timeline(id);
            }
        }
        if was_alive {
            if let (Some(stage), Some(node)) = (&self.stage, self.node) {
                stage.update_style(node, |style| style.translate.x = 0.0);
            }
        }
    }
}

impl Drop for MarqueeHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Mount a looping drift on `node`
///
/// `span_px` is the distance covered by one cycle; the node wraps back
/// to its origin every `cycle_ms`.
pub fn marquee(
    engine: &Engine,
    stage: &Stage,
    node: NodeId,
    span_px: f32,
    cycle_ms: u32,
    capabilities: &CapabilityService,
) -> MarqueeHandle {
    if span_px <= 0.0 || cycle_ms == 0 {
        warn!(span_px, cycle_ms, "degenerate marquee, leaving node static");
        return MarqueeHandle::inert();
    }
    if capabilities.is_reduced() {
        return MarqueeHandle::inert();
    }
    let Some(scheduler) = engine.handle() else {
        return MarqueeHandle::inert();
    };

    let mut timeline = Timeline::new();
    let entry = timeline.add(0, cycle_ms, 0.0, -span_px);
    timeline.set_loop(-1);
    timeline.start();
    let Some(timeline_id) = scheduler.register_timeline(timeline) else {
        return MarqueeHandle::inert();
    };

    let alive = Arc::new(AtomicBool::new(true));
    let applier_stage = stage.clone();
    let applier_sched = scheduler.clone();
    let applier_alive = alive.clone();
    let tick = scheduler.add_tick_callback(Box::new(move |_dt| {
        if !applier_alive.load(Ordering::SeqCst) {
            return false;
        }
        let value = applier_sched.with_timeline(timeline_id, |t| t.value(entry));
        let Some(value) = value else {
            return false;
        };
        if let Some(x) = value {
            applier_stage.update_style(node, |style| style.translate.x = x);
        }
        true
    }));

    let mut handle = MarqueeHandle {
        alive,
        stage: Some(stage.clone()),
        scheduler: Some(scheduler),
        node: Some(node),
        timeline: Some(timeline_id),
        tick,
    };
    if handle.tick.is_none() {
        handle.cancel();
        return MarqueeHandle::inert();
    }
    handle
}
