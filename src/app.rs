use std::fmt;

use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::camera::Camera;
use crate::config::EffectConfig;
use crate::effects::{reveal_staggered, schedule_disperse, FlashState, HorizonFlash, RevealTarget};
use crate::hexfield::{self, HexField};
use crate::scene::SceneGraph;
use crate::scheduler::Scheduler;
use crate::tween::{AnimationEngine, TweenEngine};

/// Everything the opening effect owns, driven one frame at a time.
///
/// `init` builds the field and flash and queues every phase; `tick`
/// advances the phase queue, the tween clock and the flash; `dispose`
/// drops outstanding work and unlinks what is still in the scene.
pub struct SceneContext {
    config: EffectConfig,
    scene: SceneGraph,
    camera: Camera,
    engine: TweenEngine,
    scheduler: Scheduler<TweenEngine>,
    field: HexField,
    flash: HorizonFlash,
    reveal: Vec<RevealTarget>,
    now_ms: f64,
    frames: u64,
    disposed: bool,
}

impl SceneContext {
    pub fn init(config: EffectConfig, seed: u64) -> Self {
        let scene = SceneGraph::new();
        let camera = Camera::at(config.camera_position);
        let mut engine = TweenEngine::new(scene.clone());
        let mut scheduler = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let field = hexfield::generate(&scene, &mut rng, config.hexagons.count);
        let flash = HorizonFlash::spawn(&scene, config.flash);
        let reveal = reveal_staggered(
            &mut engine,
            &mut rng,
            &field,
            config.hexagons.reveal_delay_ms,
            config.hexagons.stagger_ms,
        );
        schedule_disperse(
            &mut scheduler,
            &scene,
            &field,
            config.hexagons.disperse_after_ms,
        );
        info!(
            "scene initialised with seed {seed}: {} clusters, disperse in {}ms",
            field.len(),
            config.hexagons.disperse_after_ms
        );

        let context = Self {
            config,
            scene,
            camera,
            engine,
            scheduler,
            field,
            flash,
            reveal,
            now_ms: 0.0,
            frames: 0,
            disposed: false,
        };
        if context.config.look_at_camera {
            context.look_at_camera();
        }
        context
    }

    /// Turns the field and the flash to face the camera.
    pub fn look_at_camera(&self) {
        let target = self.camera.world_position();
        self.scene.look_at(self.field.root, target);
        self.scene.look_at(self.flash.node(), target);
    }

    /// Advances one rendered frame of `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f64) {
        self.tick_to(self.now_ms + dt_ms.max(0.0));
    }

    /// Advances one rendered frame ending at the absolute time `time_ms`.
    pub fn tick_to(&mut self, time_ms: f64) {
        if self.disposed {
            return;
        }
        let target = time_ms.max(self.now_ms);

        self.scheduler
            .run_due(target, &mut self.engine, |engine, fire_at, label| {
                engine.advance_to(fire_at);
                info!("{label} phase fired at {fire_at:.1}ms");
            });
        self.engine.advance_to(target);
        self.flash.step(&self.scene);

        self.now_ms = target;
        self.frames += 1;
        debug!(
            "frame {} at {:.1}ms: {} tween(s) active",
            self.frames,
            self.now_ms,
            self.engine.active_count()
        );
    }

    /// Drops pending phases and tweens and unlinks the field and flash.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.engine.cancel_where(&mut |_| true);
        self.scheduler = Scheduler::new();
        self.scene.remove(self.field.root);
        self.scene.remove(self.flash.node());
        self.disposed = true;
        info!("scene disposed ({cancelled} tween(s) cancelled)");
    }

    /// True once no phase, tween or flash frame is left to run.
    pub fn is_settled(&self) -> bool {
        self.disposed
            || (self.scheduler.is_empty() && self.engine.is_idle() && self.flash.is_finished())
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn field(&self) -> &HexField {
        &self.field
    }

    pub fn flash(&self) -> &HorizonFlash {
        &self.flash
    }

    pub fn reveal_targets(&self) -> &[RevealTarget] {
        &self.reveal
    }

    pub fn now(&self) -> f64 {
        self.now_ms
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn summary(&self) -> StateSummary {
        let mut visible = 0;
        let mut opacity_sum = 0.0;
        let mut color_sum = Vec3::ZERO;
        for element in self.field.elements() {
            if let Some((opacity, color)) = self.scene.read(element, |n| (n.opacity, n.color)) {
                if opacity > 0.0 {
                    visible += 1;
                }
                opacity_sum += opacity;
                color_sum += color;
            }
        }
        let count = self.field.element_count();
        let (mean_opacity, mean_color) = if count == 0 {
            (0.0, Vec3::ZERO)
        } else {
            (opacity_sum / count as f32, color_sum / count as f32)
        };

        StateSummary {
            time_ms: self.now_ms,
            frames: self.frames,
            field_attached: self.scene.is_attached(self.field.root),
            elements: count,
            visible_elements: visible,
            mean_opacity,
            mean_color,
            flash_state: self.flash.state(),
            flash_attached: self.scene.is_attached(self.flash.node()),
            active_tweens: self.engine.active_count(),
            pending_phases: self.scheduler.len(),
        }
    }
}

/// Bookkeeping for a loop driven by host timestamps, such as
/// `requestAnimationFrame`.
///
/// At most one frame request is outstanding at a time; a second `begin`
/// while one is queued is refused so a pending callback is never replaced.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_frame: Option<f64>,
    running: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the loop. Returns `false` when it is already running.
    pub fn begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_frame = None;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Milliseconds since the previous timestamp. The first frame after
    /// `begin`, and any timestamp earlier than the last one, count as zero.
    pub fn delta(&mut self, timestamp: f64) -> f64 {
        let dt = self
            .last_frame
            .map(|last| (timestamp - last).max(0.0))
            .unwrap_or(0.0);
        self.last_frame = Some(timestamp);
        dt
    }

    /// Releases the loop once its last frame has run.
    pub fn finish(&mut self) {
        self.running = false;
    }
}

/// Aggregate view of the effect at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSummary {
    pub time_ms: f64,
    pub frames: u64,
    pub field_attached: bool,
    pub elements: usize,
    pub visible_elements: usize,
    pub mean_opacity: f32,
    pub mean_color: Vec3,
    pub flash_state: FlashState,
    pub flash_attached: bool,
    pub active_tweens: usize,
    pub pending_phases: usize,
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.0}ms frame={} field={} visible={}/{} opacity={:.2} color=({:.2}, {:.2}, {:.2}) flash={:?} tweens={}",
            self.time_ms,
            self.frames,
            if self.field_attached { "attached" } else { "detached" },
            self.visible_elements,
            self.elements,
            self.mean_opacity,
            self.mean_color.x,
            self.mean_color.y,
            self.mean_color.z,
            self.flash_state,
            self.active_tweens,
        )
    }
}

pub fn print_final_state(context: &SceneContext) {
    let summary = context.summary();
    println!("Final state:");
    println!(
        " - field {} after {} frame(s) ({:.0}ms)",
        if summary.field_attached { "attached" } else { "detached" },
        summary.frames,
        summary.time_ms
    );
    println!(
        " - elements visible={}/{} opacity={:.2} color=({:.2}, {:.2}, {:.2})",
        summary.visible_elements,
        summary.elements,
        summary.mean_opacity,
        summary.mean_color.x,
        summary.mean_color.y,
        summary.mean_color.z
    );
    println!(
        " - flash {:?} ({})",
        summary.flash_state,
        if summary.flash_attached { "attached" } else { "detached" }
    );
    println!(
        " - {} tween(s) and {} phase(s) outstanding",
        summary.active_tweens, summary.pending_phases
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{DISPERSE_COLOR, REVEAL_OPACITY};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn run_until(context: &mut SceneContext, time_ms: f64) {
        while context.now() + FRAME_MS <= time_ms {
            context.tick(FRAME_MS);
        }
        if context.now() < time_ms {
            context.tick_to(time_ms);
        }
    }

    #[test]
    fn reveal_lands_every_element_on_its_target() {
        let mut context = SceneContext::init(EffectConfig::default(), 42);
        let last_start = 1000.0 + 49.0 * 50.0;
        run_until(&mut context, last_start + 2000.0);

        let scene = context.scene().clone();
        for sent in context.reveal_targets() {
            let node = scene.get(sent.node).unwrap();
            assert_eq!(node.position, sent.target);
            assert_eq!(node.opacity, REVEAL_OPACITY);
            assert_eq!(node.scale, Vec3::ONE);
        }
    }

    #[test]
    fn disperse_runs_on_schedule() {
        let mut context = SceneContext::init(EffectConfig::default(), 42);

        run_until(&mut context, 4999.0);
        let summary = context.summary();
        assert!(summary.field_attached);
        assert_eq!(summary.visible_elements, 100);

        run_until(&mut context, 5010.0);
        let scene = context.scene().clone();
        assert!(context
            .field()
            .elements()
            .all(|e| scene.get(e).unwrap().color == DISPERSE_COLOR));

        run_until(&mut context, 5499.0);
        assert!(context.summary().field_attached);

        run_until(&mut context, 5510.0);
        let summary = context.summary();
        assert!(!summary.field_attached);
        assert_eq!(summary.visible_elements, 0);
        assert_eq!(summary.mean_opacity, 0.0);
    }

    #[test]
    fn flash_finishes_independently_of_frame_length() {
        let mut context = SceneContext::init(EffectConfig::default(), 1);
        for _ in 0..73 {
            context.tick(1.0);
        }
        assert!(context.flash().is_finished());
        assert!(!context.scene().is_attached(context.flash().node()));
        assert!(context.scene().is_attached(context.field().root));
    }

    #[test]
    fn settles_after_all_phases() {
        let mut context = SceneContext::init(EffectConfig::default(), 9);
        run_until(&mut context, 7000.0);
        assert!(context.is_settled());
        let summary = context.summary();
        assert_eq!(summary.active_tweens, 0);
        assert_eq!(summary.pending_phases, 0);
    }

    #[test]
    fn dispose_stops_everything() {
        let mut context = SceneContext::init(EffectConfig::default(), 5);
        run_until(&mut context, 1500.0);
        context.dispose();
        assert!(context.is_settled());
        assert!(context.scene().roots().is_empty());
        let frames = context.frames();
        context.tick(FRAME_MS);
        assert_eq!(context.frames(), frames);
    }

    #[test]
    fn frame_clock_refuses_a_second_loop() {
        let mut clock = FrameClock::new();
        assert!(clock.begin());
        assert!(!clock.begin());
        clock.finish();
        assert!(!clock.is_running());
        assert!(clock.begin());
    }

    #[test]
    fn frame_clock_measures_between_timestamps() {
        let mut clock = FrameClock::new();
        clock.begin();
        assert_eq!(clock.delta(1000.0), 0.0);
        assert_eq!(clock.delta(1016.0), 16.0);
        assert_eq!(clock.delta(1010.0), 0.0);
        assert_eq!(clock.delta(1030.0), 20.0);

        clock.finish();
        clock.begin();
        assert_eq!(clock.delta(5000.0), 0.0);
    }

    #[test]
    fn dispose_lets_a_queued_frame_run_harmlessly() {
        let mut context = SceneContext::init(EffectConfig::default(), 6);
        let mut clock = FrameClock::new();
        assert!(clock.begin());
        context.tick(clock.delta(0.0));
        context.tick(clock.delta(16.0));

        context.dispose();
        // The frame requested before disposal still arrives.
        context.tick(clock.delta(32.0));
        assert!(context.is_settled());
        assert_eq!(context.frames(), 2);
        clock.finish();
        assert!(!clock.is_running());
    }

    #[test]
    fn look_at_turns_field_towards_camera() {
        let config = EffectConfig {
            look_at_camera: true,
            camera_position: Vec3::new(0.0, 0.0, -5.0),
            ..EffectConfig::default()
        };
        let context = SceneContext::init(config, 2);
        let rotation = context.scene().get(context.field().root).unwrap().rotation;
        assert!((rotation * Vec3::Z).abs_diff_eq(-Vec3::Z, 1e-5));
    }

    #[test]
    fn empty_field_still_runs() {
        let mut config = EffectConfig::default();
        config.hexagons.count = 0;
        let mut context = SceneContext::init(config, 3);
        run_until(&mut context, 6000.0);
        let summary = context.summary();
        assert_eq!(summary.elements, 0);
        assert!(!summary.field_attached);
        assert!(context.is_settled());
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = SceneContext::init(EffectConfig::default(), 77);
        let b = SceneContext::init(EffectConfig::default(), 77);
        assert_eq!(a.reveal_targets(), b.reveal_targets());
        assert_eq!(a.field(), b.field());
    }
}
