//! Time-based property interpolation for scene nodes.
//!
//! Tweens are scheduled against a single engine clock measured in
//! milliseconds. A tween waits for its delay, samples the node's current
//! value as its start point, interpolates towards its end value with an
//! [`Easing`] curve, writes the exact end value on its last frame, and then
//! runs its completion callbacks.

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::scene::{NodeId, SceneGraph};

/// Easing curves for tweened values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Cubic: start slow, accelerate.
    CubicIn,
    /// Cubic: start fast, decelerate.
    CubicOut,
    /// Cubic: slow at both ends.
    CubicInOut,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let inv = t - 1.0;
                inv * inv * inv + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Animatable node fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Position,
    Scale,
    Opacity,
    Color,
}

/// End value of a tween, tagged with the field it drives.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TweenTarget {
    Position(Vec3),
    Scale(Vec3),
    Opacity(f32),
    Color(Vec3),
}

impl TweenTarget {
    pub fn property(&self) -> Property {
        match self {
            TweenTarget::Position(_) => Property::Position,
            TweenTarget::Scale(_) => Property::Scale,
            TweenTarget::Opacity(_) => Property::Opacity,
            TweenTarget::Color(_) => Property::Color,
        }
    }

    fn sample(property: Property, scene: &SceneGraph, node: NodeId) -> Option<Self> {
        scene.read(node, |node| match property {
            Property::Position => TweenTarget::Position(node.position),
            Property::Scale => TweenTarget::Scale(node.scale),
            Property::Opacity => TweenTarget::Opacity(node.opacity),
            Property::Color => TweenTarget::Color(node.color),
        })
    }

    fn lerp(from: Self, to: Self, k: f32) -> Self {
        match (from, to) {
            (TweenTarget::Position(a), TweenTarget::Position(b)) => TweenTarget::Position(a.lerp(b, k)),
            (TweenTarget::Scale(a), TweenTarget::Scale(b)) => TweenTarget::Scale(a.lerp(b, k)),
            (TweenTarget::Opacity(a), TweenTarget::Opacity(b)) => TweenTarget::Opacity(a + (b - a) * k),
            (TweenTarget::Color(a), TweenTarget::Color(b)) => TweenTarget::Color(a.lerp(b, k)),
            // Start values are sampled per property, so kinds always match.
            (_, to) => to,
        }
    }

    fn write(self, scene: &SceneGraph, node: NodeId) -> bool {
        match self {
            TweenTarget::Position(value) => scene.set_position(node, value),
            TweenTarget::Scale(value) => scene.set_scale(node, value),
            TweenTarget::Opacity(value) => scene.set_opacity(node, value),
            TweenTarget::Color(value) => scene.set_color(node, value),
        }
    }
}

/// A scheduled interpolation of one node field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub node: NodeId,
    pub target: TweenTarget,
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn to(node: NodeId, target: TweenTarget, duration_ms: f64) -> Self {
        Self {
            node,
            target,
            duration_ms,
            delay_ms: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn property(&self) -> Property {
        self.target.property()
    }
}

/// Identifies a scheduled tween.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

pub type CompletionCallback = Box<dyn FnOnce()>;

/// The capabilities the animators need from an interpolation backend.
pub trait AnimationEngine {
    /// Queues a tween whose delay starts counting at the current clock.
    fn schedule(&mut self, tween: Tween) -> TweenHandle;

    /// Registers a callback run once when the tween finishes. Returns
    /// `false` if the tween already finished or was cancelled.
    fn on_complete(&mut self, handle: TweenHandle, callback: CompletionCallback) -> bool;

    /// Drops every unfinished tween matching `predicate`, delayed or
    /// running, without running its callbacks. Returns how many were dropped.
    fn cancel_where(&mut self, predicate: &mut dyn FnMut(&Tween) -> bool) -> usize;

    /// Moves the clock forward and applies every due tween.
    fn advance(&mut self, dt_ms: f64);

    /// Current clock in milliseconds.
    fn now(&self) -> f64;
}

struct ActiveTween {
    handle: TweenHandle,
    tween: Tween,
    start_at: f64,
    from: Option<TweenTarget>,
    callbacks: Vec<CompletionCallback>,
}

impl ActiveTween {
    fn progress(&self, now: f64) -> f32 {
        if self.tween.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now - self.start_at) / self.tween.duration_ms).clamp(0.0, 1.0) as f32
    }
}

/// Tween engine writing straight into a [`SceneGraph`].
///
/// Running tweens are kept ordered by start time, then schedule order, so
/// when two tweens drive the same field in one frame the later-started one
/// wins and completion callbacks fire in delay order.
pub struct TweenEngine {
    scene: SceneGraph,
    now_ms: f64,
    next_handle: u64,
    tweens: Vec<ActiveTween>,
}

impl TweenEngine {
    pub fn new(scene: SceneGraph) -> Self {
        Self {
            scene,
            now_ms: 0.0,
            next_handle: 0,
            tweens: Vec::new(),
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Number of tweens that have not completed yet, including delayed ones.
    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Moves the clock to an absolute time. Times in the past are ignored.
    pub fn advance_to(&mut self, time_ms: f64) {
        if time_ms > self.now_ms {
            self.now_ms = time_ms;
        }
        let now = self.now_ms;
        let scene = &self.scene;
        let mut finished = Vec::new();
        let mut index = 0;

        while index < self.tweens.len() {
            let active = &mut self.tweens[index];
            if active.start_at > now {
                break;
            }
            let node = active.tween.node;
            let from = match active.from {
                Some(from) => from,
                None => match TweenTarget::sample(active.tween.property(), scene, node) {
                    Some(sampled) => {
                        active.from = Some(sampled);
                        sampled
                    }
                    None => {
                        warn!("dropping tween {:?}: node {node:?} no longer exists", active.handle);
                        self.tweens.remove(index);
                        continue;
                    }
                },
            };

            let t = active.progress(now);
            let value = if t >= 1.0 {
                active.tween.target
            } else {
                TweenTarget::lerp(from, active.tween.target, active.tween.easing.apply(t))
            };
            value.write(scene, node);

            if t >= 1.0 {
                finished.push(self.tweens.remove(index));
            } else {
                index += 1;
            }
        }

        if !finished.is_empty() {
            debug!("{} tween(s) finished at {now:.1}ms", finished.len());
        }
        for done in finished {
            for callback in done.callbacks {
                callback();
            }
        }
    }
}

impl AnimationEngine for TweenEngine {
    fn schedule(&mut self, tween: Tween) -> TweenHandle {
        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        let start_at = self.now_ms + tween.delay_ms.max(0.0);
        let position = self
            .tweens
            .partition_point(|active| active.start_at <= start_at);
        self.tweens.insert(
            position,
            ActiveTween {
                handle,
                tween,
                start_at,
                from: None,
                callbacks: Vec::new(),
            },
        );
        handle
    }

    fn on_complete(&mut self, handle: TweenHandle, callback: CompletionCallback) -> bool {
        match self.tweens.iter_mut().find(|active| active.handle == handle) {
            Some(active) => {
                active.callbacks.push(callback);
                true
            }
            None => false,
        }
    }

    fn cancel_where(&mut self, predicate: &mut dyn FnMut(&Tween) -> bool) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|active| !predicate(&active.tween));
        before - self.tweens.len()
    }

    fn advance(&mut self, dt_ms: f64) {
        self.advance_to(self.now_ms + dt_ms.max(0.0));
    }

    fn now(&self) -> f64 {
        self.now_ms
    }
}
