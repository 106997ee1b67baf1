//! Text segmentation and text effects
//!
//! [`split_text`] is a pure function from a string to fragments; node
//! construction happens separately in [`TextReveal::mount`], so the
//! split is trivially testable and remounting can be made idempotent.
//! Spaces are preserved as non-animated fragments and never consume a
//! stagger slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use unveil_animation::{
    Easing, SchedulerHandle, StaggerBuilder, TickCallbackId, Timeline, TimelineEntryId, TimelineId,
};
use unveil_core::{CapabilityService, Vec2};

use crate::engine::Engine;
use crate::reveal::blended;
use crate::stage::{NodeId, NodeStyle, Stage, Threshold, WatcherEvent, WatcherId};

/// How to segment a block of text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMode {
    /// Every non-space character animates on its own
    Chars,
    /// Whole words animate; inter-word spacing rides along
    Words,
    /// The whole block is a single fragment
    Lines,
}

/// One segment of a split text
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    /// Cascade position; `None` for width-preserving space runs
    pub stagger_index: Option<usize>,
}

impl Fragment {
    pub fn is_animated(&self) -> bool {
        self.stagger_index.is_some()
    }
}

/// Ordered fragments produced by [`split_text`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FragmentSequence {
    fragments: Vec<Fragment>,
}

impl FragmentSequence {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn animated_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_animated()).count()
    }
}

/// Split text into fragments without touching any node
pub fn split_text(text: &str, mode: SplitMode) -> FragmentSequence {
    let mut fragments = Vec::new();
    match mode {
        SplitMode::Chars => {
            let mut index = 0;
            let mut space_run = String::new();
            for c in text.chars() {
                if c.is_whitespace() {
                    space_run.push(c);
                    continue;
                }
                if !space_run.is_empty() {
                    fragments.push(Fragment {
                        text: std::mem::take(&mut space_run),
                        stagger_index: None,
                    });
                }
                fragments.push(Fragment {
                    text: c.to_string(),
                    stagger_index: Some(index),
                });
                index += 1;
            }
            if !space_run.is_empty() {
                fragments.push(Fragment {
                    text: space_run,
                    stagger_index: None,
                });
            }
        }
        SplitMode::Words => {
            let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
            let last = words.len().saturating_sub(1);
            for (index, word) in words.into_iter().enumerate() {
                let text = if index < last {
                    format!("{word} ")
                } else {
                    word.to_string()
                };
                fragments.push(Fragment {
                    text,
                    stagger_index: Some(index),
                });
            }
        }
        SplitMode::Lines => {
            if !text.is_empty() {
                fragments.push(Fragment {
                    text: text.to_string(),
                    stagger_index: Some(0),
                });
            }
        }
    }
    FragmentSequence { fragments }
}

const TEXT_REVEAL_DURATION_MS: u32 = 600;
const TEXT_REVEAL_THRESHOLD: Threshold = Threshold::Top(0.85);

/// Owner of a mounted text cascade
#[derive(Default)]
pub struct TextRevealHandle {
    alive: Arc<AtomicBool>,
    stage: Option<Stage>,
    scheduler: Option<SchedulerHandle>,
    watcher: Option<WatcherId>,
    timeline: Option<TimelineId>,
    tick: Option<TickCallbackId>,
}

impl TextRevealHandle {
    fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

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

impl Drop for TextRevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Per-fragment text reveal
pub struct TextReveal;

impl TextReveal {
    /// Split `text` into fragment children of `node` and cascade them in
    ///
    /// Idempotent: any previous fragment children are cleared first, so
    /// remounting yields the same fragment count as a single mount.
    #[allow(clippy::too_many_arguments)]
    pub fn mount(
        engine: &Engine,
        stage: &Stage,
        node: NodeId,
        text: &str,
        mode: SplitMode,
        step_ms: u32,
        offset_y: f32,
        capabilities: &CapabilityService,
    ) -> TextRevealHandle {
        for child in stage.children(node) {
            stage.remove_node(child);
        }

        let sequence = split_text(text, mode);
        let bounds = stage.bounds(node).unwrap_or_default();
        let mut animated: Vec<NodeId> = Vec::with_capacity(sequence.animated_count());
        for fragment in sequence.fragments() {
            let Some(child) = stage.create_child(node) else {
                return TextRevealHandle::inert();
            };
            stage.set_text(child, fragment.text.clone());
            stage.set_bounds(child, bounds);
            if fragment.is_animated() {
                animated.push(child);
            }
        }

        if capabilities.is_reduced() {
            return TextRevealHandle::inert();
        }
        let Some(scheduler) = engine.handle() else {
            return TextRevealHandle::inert();
        };
        if animated.is_empty() {
            return TextRevealHandle::inert();
        }

        let hidden = NodeStyle {
            opacity: 0.0,
            translate: Vec2::new(0.0, offset_y),
            scale: 1.0,
        };
        for &child in &animated {
            stage.set_style(child, hidden);
        }

        let mut timeline = Timeline::new();
        let entries = StaggerBuilder::new()
            .step(step_ms)
            .duration(TEXT_REVEAL_DURATION_MS)
            .values(0.0, 1.0)
            .easing(Easing::EaseOut)
            .add_to(&mut timeline, animated.len());
        let Some(timeline_id) = scheduler.register_timeline(timeline) else {
            return TextRevealHandle::inert();
        };

        let alive = Arc::new(AtomicBool::new(true));
        let started = Arc::new(AtomicBool::new(false));
        let pairs: Vec<(TimelineEntryId, NodeId)> = entries.into_iter().zip(animated).collect();

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
            let done = applier_started.load(Ordering::SeqCst)
                && !applier_sched.is_timeline_playing(timeline_id);
            !done
        }));

        let watcher_sched = scheduler.clone();
        let watcher = stage.watch(node, TEXT_REVEAL_THRESHOLD, false, move |event| {
            if event == WatcherEvent::Enter {
                started.store(true, Ordering::SeqCst);
                watcher_sched.start_timeline(timeline_id);
            }
        });

        let mut handle = TextRevealHandle {
            alive,
            stage: Some(stage.clone()),
            scheduler: Some(scheduler),
            watcher,
            timeline: Some(timeline_id),
            tick,
        };
        if handle.watcher.is_none() {
            handle.cancel();
            return TextRevealHandle::inert();
        }
        handle
    }
}

const SCRAMBLE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789#$%&";
const SCRAMBLE_MIN_CHAR_MS: f32 = 16.0;

/// Owner of a mounted scramble effect
#[derive(Default)]
pub struct ScrambleHandle {
    alive: Arc<AtomicBool>,
    stage: Option<Stage>,
    scheduler: Option<SchedulerHandle>,
    watcher: Option<WatcherId>,
    tick: Option<TickCallbackId>,
    node: Option<NodeId>,
    original: String,
}

impl ScrambleHandle {
    fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn release(self) {}

    fn cancel(&mut self) {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            if let Some(stage) = &self.stage {
                stage.unwatch(watcher);
            }
        }
        if let Some(scheduler) = &self.scheduler {
            if let Some(id) = self.tick.take() {
                scheduler.remove_tick_callback(id);
            }
        }
        // A cancelled mid-flight scramble restores the real content
        if was_alive {
            if let (Some(stage), Some(node)) = (&self.stage, self.node) {
                stage.set_text(node, self.original.clone());
            }
        }
    }
}

impl Drop for ScrambleHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Decode-style text scramble
pub struct Scramble;

impl Scramble {
    /// Scramble `node`'s text once it is at least half visible
    ///
    /// Characters lock in left to right, each after a fixed slice of the
    /// total duration, and the effect ends exactly on the original
    /// string. Spaces are never scrambled.
    pub fn mount(
        engine: &Engine,
        stage: &Stage,
        node: NodeId,
        text: &str,
        duration_ms: u32,
        capabilities: &CapabilityService,
    ) -> ScrambleHandle {
        stage.set_text(node, text);

        if capabilities.is_reduced() {
            return ScrambleHandle::inert();
        }
        let Some(scheduler) = engine.handle() else {
            return ScrambleHandle::inert();
        };

        let chars: Vec<char> = text.chars().collect();
        let animated_count = chars.iter().filter(|c| !c.is_whitespace()).count();
        if animated_count == 0 {
            return ScrambleHandle::inert();
        }
        let per_char_ms =
            (duration_ms as f32 / animated_count as f32).max(SCRAMBLE_MIN_CHAR_MS);

        let alive = Arc::new(AtomicBool::new(true));
        let triggered = Arc::new(AtomicBool::new(false));
        let original = text.to_string();

        let cb_stage = stage.clone();
        let cb_alive = alive.clone();
        let cb_triggered = triggered.clone();
        let cb_original = original.clone();
        let mut elapsed = 0.0_f32;
        let mut rng: u64 = 0x5DEE_CE66_D1CE_B10C;
        let tick = scheduler.add_tick_callback(Box::new(move |dt_ms| {
            if !cb_alive.load(Ordering::SeqCst) {
                return false;
            }
            if !cb_triggered.load(Ordering::SeqCst) {
                return true;
            }
            elapsed += dt_ms;
            let locked = (elapsed / per_char_ms) as usize;
            if locked >= animated_count {
                cb_stage.set_text(node, cb_original.clone());
                cb_alive.store(false, Ordering::SeqCst);
                return false;
            }

            let mut out = String::with_capacity(cb_original.len());
            let mut seen = 0;
            for &c in &chars {
                if c.is_whitespace() {
                    out.push(c);
                    continue;
                }
                if seen < locked {
                    out.push(c);
                } else {
                    rng = rng
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    let pick = (rng >> 33) as usize % SCRAMBLE_ALPHABET.len();
                    out.push(SCRAMBLE_ALPHABET[pick] as char);
                }
                seen += 1;
            }
            cb_stage.set_text(node, out);
            true
        }));

        let watcher = stage.watch(node, Threshold::visibility(0.5), false, move |event| {
            if event == WatcherEvent::Enter {
                triggered.store(true, Ordering::SeqCst);
            }
        });

        let mut handle = ScrambleHandle {
            alive,
            stage: Some(stage.clone()),
            scheduler: Some(scheduler),
            watcher,
            tick,
            node: Some(node),
            original,
        };
        if handle.watcher.is_none() {
            handle.cancel();
            return ScrambleHandle::inert();
        }
        handle
    }
}
