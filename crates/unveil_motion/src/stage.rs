//! Headless stage
//!
//! The stage is the retained node tree the motion layer runs against:
//! nodes with layout bounds, inline styles, an attached flag, and an
//! optional text payload. Hosts mirror their real scene into it and
//! feed it viewport size and scroll position; the stage dispatches
//! threshold crossings to registered watchers in registration order.
//!
//! Animation code only ever writes [`NodeStyle`]. Bounds are layout
//! input owned by the host and are never touched by watchers or
//! appliers.

use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use unveil_core::{Bounds, Vec2};

new_key_type! {
    /// Identifier for a stage node
    pub struct NodeId;

    /// Identifier for a threshold watcher
    pub struct WatcherId;
}

/// Inline style channels driven by animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub opacity: f32,
    pub translate: Vec2,
    pub scale: f32,
}

impl NodeStyle {
    /// The resting style: fully visible, untransformed
    pub fn resting() -> Self {
        Self {
            opacity: 1.0,
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self::resting()
    }
}

/// Viewport-relative trigger condition
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    /// Fires once the node's top edge rises to the given fraction of
    /// the viewport height (0.85 ≙ "top 85%")
    Top(f32),
    /// Fires once at least the given fraction of the node's height is
    /// inside the viewport
    Visibility(f32),
}

impl Threshold {
    pub fn top(fraction: f32) -> Self {
        Self::Top(fraction)
    }

    pub fn visibility(fraction: f32) -> Self {
        Self::Visibility(fraction)
    }

    fn evaluate(&self, bounds: &Bounds, viewport: Vec2, scroll_y: f32) -> bool {
        match *self {
            Threshold::Top(fraction) => bounds.y - scroll_y <= fraction * viewport.y,
            Threshold::Visibility(fraction) => {
                if bounds.height <= 0.0 {
                    return false;
                }
                let view = Bounds::new(0.0, scroll_y, viewport.x, viewport.y);
                bounds.vertical_overlap(&view) / bounds.height >= fraction
            }
        }
    }
}

/// Crossing direction reported to watcher callbacks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherEvent {
    Enter,
    Exit,
}

pub type WatcherCallback = Box<dyn FnMut(WatcherEvent) + Send>;

struct Watcher {
    node: NodeId,
    threshold: Threshold,
    repeatable: bool,
    inside: bool,
    callback: WatcherCallback,
}

#[derive(Default)]
struct Node {
    bounds: Bounds,
    style: NodeStyle,
    attached: bool,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 8]>,
    name: Option<String>,
    text: Option<String>,
}

struct StageInner {
    nodes: SlotMap<NodeId, Node>,
    // Callbacks are parked as None while running so dispatch never
    // holds the stage lock across user code.
    watchers: SlotMap<WatcherId, Option<Watcher>>,
    watcher_order: Vec<WatcherId>,
    names: FxHashMap<String, NodeId>,
    viewport: Vec2,
    scroll_y: f32,
}

impl StageInner {
    fn remove_watcher_entry(&mut self, id: WatcherId) {
        self.watchers.remove(id);
        self.watcher_order.retain(|&w| w != id);
    }
}

impl Default for StageInner {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            watchers: SlotMap::with_key(),
            watcher_order: Vec::new(),
            names: FxHashMap::default(),
            viewport: Vec2::new(1280.0, 720.0),
            scroll_y: 0.0,
        }
    }
}

/// Shared handle onto the node tree
///
/// Cheap to clone; all clones operate on the same tree.
#[derive(Clone, Default)]
pub struct Stage {
    inner: Arc<Mutex<StageInner>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StageInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Create a root-level node, attached by default
    pub fn create_node(&self) -> NodeId {
        self.lock().nodes.insert(Node {
            attached: true,
            ..Default::default()
        })
    }

    /// Create a root-level node and register it under a name
    pub fn create_named(&self, name: &str) -> NodeId {
        let mut inner = self.lock();
        let id = inner.nodes.insert(Node {
            attached: true,
            name: Some(name.to_string()),
            ..Default::default()
        });
        inner.names.insert(name.to_string(), id);
        id
    }

    /// Create a child of an existing node, inheriting its attached flag
    pub fn create_child(&self, parent: NodeId) -> Option<NodeId> {
        let mut inner = self.lock();
        let attached = inner.nodes.get(parent)?.attached;
        let id = inner.nodes.insert(Node {
            attached,
            parent: Some(parent),
            ..Default::default()
        });
        if let Some(node) = inner.nodes.get_mut(parent) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Remove a node and its subtree, releasing any watchers on them
    pub fn remove_node(&self, id: NodeId) {
        let mut inner = self.lock();
        if !inner.nodes.contains_key(id) {
            return;
        }

        let root_parent = inner.nodes.get(id).and_then(|n| n.parent);

        let mut removed: Vec<NodeId> = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = inner.nodes.remove(current) {
                if let Some(name) = node.name {
                    inner.names.remove(&name);
                }
                stack.extend(node.children.iter().copied());
                removed.push(current);
            }
        }

        if let Some(parent) = root_parent {
            if let Some(node) = inner.nodes.get_mut(parent) {
                node.children.retain(|c| *c != id);
            }
        }

        let stale: Vec<WatcherId> = inner
            .watchers
            .iter()
            .filter_map(|(wid, slot)| {
                let node = slot.as_ref().map(|w| w.node)?;
                removed.contains(&node).then_some(wid)
            })
            .collect();
        for wid in stale {
            inner.remove_watcher_entry(wid);
        }
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.lock().nodes.contains_key(id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.lock().names.get(name).copied()
    }

    /// Mark the node live; watchers are re-evaluated
    pub fn attach(&self, id: NodeId) {
        {
            let mut inner = self.lock();
            if let Some(node) = inner.nodes.get_mut(id) {
                node.attached = true;
            }
        }
        self.dispatch_watchers();
    }

    /// Mark the node detached; watchers skip it silently
    pub fn detach(&self, id: NodeId) {
        let mut inner = self.lock();
        if let Some(node) = inner.nodes.get_mut(id) {
            node.attached = false;
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.lock().nodes.get(id).map(|n| n.attached).unwrap_or(false)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.lock()
            .nodes
            .get(id)
            .map(|n| n.children.to_vec())
            .unwrap_or_default()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.lock().nodes.get(id).map(|n| n.children.len()).unwrap_or(0)
    }

    // ========================================================================
    // Layout, style, text
    // ========================================================================

    /// Update layout bounds (host-owned); watchers are re-evaluated
    pub fn set_bounds(&self, id: NodeId, bounds: Bounds) {
        {
            let mut inner = self.lock();
            if let Some(node) = inner.nodes.get_mut(id) {
                node.bounds = bounds;
            }
        }
        self.dispatch_watchers();
    }

    pub fn bounds(&self, id: NodeId) -> Option<Bounds> {
        self.lock().nodes.get(id).map(|n| n.bounds)
    }

    /// Replace the inline style; never triggers watcher evaluation
    pub fn set_style(&self, id: NodeId, style: NodeStyle) {
        let mut inner = self.lock();
        if let Some(node) = inner.nodes.get_mut(id) {
            node.style = style;
        }
    }

    /// Mutate the inline style in place; never triggers watcher evaluation
    pub fn update_style(&self, id: NodeId, f: impl FnOnce(&mut NodeStyle)) {
        let mut inner = self.lock();
        if let Some(node) = inner.nodes.get_mut(id) {
            f(&mut node.style);
        }
    }

    pub fn style(&self, id: NodeId) -> Option<NodeStyle> {
        self.lock().nodes.get(id).map(|n| n.style)
    }

    pub fn set_text(&self, id: NodeId, text: impl Into<String>) {
        let mut inner = self.lock();
        if let Some(node) = inner.nodes.get_mut(id) {
            node.text = Some(text.into());
        }
    }

    pub fn text(&self, id: NodeId) -> Option<String> {
        self.lock().nodes.get(id).and_then(|n| n.text.clone())
    }

    // ========================================================================
    // Viewport and scroll
    // ========================================================================

    pub fn set_viewport(&self, size: Vec2) {
        self.lock().viewport = size;
        self.dispatch_watchers();
    }

    pub fn viewport(&self) -> Vec2 {
        self.lock().viewport
    }

    pub fn set_scroll(&self, y: f32) {
        self.lock().scroll_y = y;
        self.dispatch_watchers();
    }

    pub fn scroll_y(&self) -> f32 {
        self.lock().scroll_y
    }

    // ========================================================================
    // Watchers
    // ========================================================================

    /// Register a threshold watcher on a node
    ///
    /// One-shot watchers (`repeatable = false`) are torn down after
    /// their first `Enter`. The threshold is evaluated immediately, so
    /// a node already past it fires during registration. Returns `None`
    /// if the node does not exist.
    pub fn watch(
        &self,
        node: NodeId,
        threshold: Threshold,
        repeatable: bool,
        callback: impl FnMut(WatcherEvent) + Send + 'static,
    ) -> Option<WatcherId> {
        let id = {
            let mut inner = self.lock();
            if !inner.nodes.contains_key(node) {
                return None;
            }
            let id = inner.watchers.insert(Some(Watcher {
                node,
                threshold,
                repeatable,
                inside: false,
                callback: Box::new(callback),
            }));
            inner.watcher_order.push(id);
            id
        };
        self.step_watcher(id);
        Some(id)
    }

    /// Release a watcher; its callback will never run again
    pub fn unwatch(&self, id: WatcherId) {
        self.lock().remove_watcher_entry(id);
    }

    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    fn dispatch_watchers(&self) {
        let order: Vec<WatcherId> = self.lock().watcher_order.clone();
        for id in order {
            self.step_watcher(id);
        }
    }

    fn step_watcher(&self, id: WatcherId) {
        let fired = {
            let mut inner = self.lock();
            let Some(mut watcher) = inner.watchers.get_mut(id).and_then(Option::take) else {
                return;
            };
            let Some(node) = inner.nodes.get(watcher.node) else {
                inner.remove_watcher_entry(id);
                return;
            };
            if !node.attached {
                if let Some(slot) = inner.watchers.get_mut(id) {
                    *slot = Some(watcher);
                }
                return;
            }
            let inside = watcher
                .threshold
                .evaluate(&node.bounds, inner.viewport, inner.scroll_y);
            let event = match (watcher.inside, inside) {
                (false, true) => Some(WatcherEvent::Enter),
                (true, false) if watcher.repeatable => Some(WatcherEvent::Exit),
                _ => None,
            };
            watcher.inside = inside;
            match event {
                Some(event) => Some((watcher, event)),
                None => {
                    if let Some(slot) = inner.watchers.get_mut(id) {
                        *slot = Some(watcher);
                    }
                    return;
                }
            }
        };

        if let Some((mut watcher, event)) = fired {
            let one_shot = !watcher.repeatable;
            (watcher.callback)(event);

            let mut inner = self.lock();
            if one_shot && event == WatcherEvent::Enter {
                inner.remove_watcher_entry(id);
            } else if let Some(slot) = inner.watchers.get_mut(id) {
                *slot = Some(watcher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_node_lifecycle() {
        let stage = Stage::new();
        let node = stage.create_node();
        assert!(stage.contains(node));
        assert!(stage.is_attached(node));

        stage.set_bounds(node, Bounds::new(0.0, 100.0, 200.0, 50.0));
        assert_eq!(stage.bounds(node), Some(Bounds::new(0.0, 100.0, 200.0, 50.0)));

        stage.remove_node(node);
        assert!(!stage.contains(node));
    }

    #[test]
    fn test_name_registry() {
        let stage = Stage::new();
        let hero = stage.create_named("hero");
        assert_eq!(stage.node_by_name("hero"), Some(hero));
        stage.remove_node(hero);
        assert_eq!(stage.node_by_name("hero"), None);
    }

    #[test]
    fn test_children() {
        let stage = Stage::new();
        let list = stage.create_node();
        let a = stage.create_child(list).unwrap();
        let b = stage.create_child(list).unwrap();
        assert_eq!(stage.children(list), vec![a, b]);

        stage.remove_node(a);
        assert_eq!(stage.children(list), vec![b]);

        // Removing the parent takes the subtree with it
        stage.remove_node(list);
        assert!(!stage.contains(b));
        assert_eq!(stage.node_count(), 0);
    }

    #[test]
    fn test_style_defaults_to_resting() {
        let stage = Stage::new();
        let node = stage.create_node();
        assert_eq!(stage.style(node), Some(NodeStyle::resting()));

        stage.update_style(node, |s| s.opacity = 0.0);
        assert_eq!(stage.style(node).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_top_threshold_fires_on_scroll() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 50.0));

        let fires = Arc::new(AtomicU32::new(0));
        let counter = fires.clone();
        stage.watch(node, Threshold::top(0.85), false, move |event| {
            assert_eq!(event, WatcherEvent::Enter);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Line sits at 510px; node top reaches it at scroll 490
        stage.set_scroll(400.0);
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        stage.set_scroll(500.0);
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        // One-shot: torn down after the first fire
        assert_eq!(stage.watcher_count(), 0);
        stage.set_scroll(0.0);
        stage.set_scroll(600.0);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeatable_watcher_enters_and_exits() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 50.0));

        let events = Arc::new(Mutex::new(Vec::new()));
        let log = events.clone();
        stage.watch(node, Threshold::top(0.85), true, move |event| {
            log.lock().unwrap().push(event);
        });

        stage.set_scroll(500.0);
        stage.set_scroll(0.0);
        stage.set_scroll(500.0);

        assert_eq!(
            *events.lock().unwrap(),
            vec![WatcherEvent::Enter, WatcherEvent::Exit, WatcherEvent::Enter]
        );
        assert_eq!(stage.watcher_count(), 1);
    }

    #[test]
    fn test_watcher_fires_immediately_when_already_inside() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 100.0, 800.0, 50.0));

        let fires = Arc::new(AtomicU32::new(0));
        let counter = fires.clone();
        stage.watch(node, Threshold::top(0.85), false, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_node_skipped_until_attach() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 100.0, 800.0, 50.0));
        stage.detach(node);

        let fires = Arc::new(AtomicU32::new(0));
        let counter = fires.clone();
        stage.watch(node, Threshold::top(0.85), false, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        stage.set_scroll(10.0);
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        stage.attach(node);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_style_mutation_does_not_dispatch() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 50.0));
        stage.set_scroll(500.0);

        let fires = Arc::new(AtomicU32::new(0));
        let counter = fires.clone();
        // Registered after scroll, so the node is already inside and the
        // watcher fires once during registration.
        stage.watch(node, Threshold::top(0.85), true, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        stage.set_style(node, NodeStyle::resting());
        stage.update_style(node, |s| s.opacity = 0.5);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let a = stage.create_node();
        let b = stage.create_node();
        stage.set_bounds(a, Bounds::new(0.0, 1000.0, 800.0, 50.0));
        stage.set_bounds(b, Bounds::new(0.0, 1000.0, 800.0, 50.0));

        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        stage.watch(b, Threshold::top(0.85), false, move |_| {
            first.lock().unwrap().push("b");
        });
        stage.watch(a, Threshold::top(0.85), false, move |_| {
            second.lock().unwrap().push("a");
        });

        stage.set_scroll(500.0);
        assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_visibility_threshold() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 200.0));

        let fires = Arc::new(AtomicU32::new(0));
        let counter = fires.clone();
        stage.watch(node, Threshold::visibility(0.5), false, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Viewport covers 450..1050: 50px of the 200px node visible
        stage.set_scroll(450.0);
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        // Viewport covers 500..1100: exactly half visible
        stage.set_scroll(500.0);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_node_releases_watchers() {
        let stage = Stage::new();
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 5000.0, 800.0, 50.0));
        stage.watch(node, Threshold::top(0.85), true, move |_| {});
        assert_eq!(stage.watcher_count(), 1);

        stage.remove_node(node);
        assert_eq!(stage.watcher_count(), 0);
    }

    #[test]
    fn test_watch_missing_node_returns_none() {
        let stage = Stage::new();
        let node = stage.create_node();
        stage.remove_node(node);
        assert!(stage.watch(node, Threshold::top(0.85), false, |_| {}).is_none());
    }

    #[test]
    fn test_callback_may_use_stage() {
        let stage = Stage::new();
        stage.set_viewport(Vec2::new(800.0, 600.0));
        let node = stage.create_node();
        stage.set_bounds(node, Bounds::new(0.0, 1000.0, 800.0, 50.0));

        let inner_stage = stage.clone();
        stage.watch(node, Threshold::top(0.85), false, move |_| {
            inner_stage.update_style(node, |s| s.opacity = 0.25);
        });

        stage.set_scroll(500.0);
        assert_eq!(stage.style(node).unwrap().opacity, 0.25);
    }
}
