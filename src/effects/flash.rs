use glam::Vec3;
use log::info;

use crate::config::FlashConfig;
use crate::scene::{NodeId, NodeKind, SceneGraph, SceneNode};

/// `#ffc65d`
pub const FLASH_COLOR: Vec3 = Vec3::new(1.0, 198.0 / 255.0, 93.0 / 255.0);

const INITIAL_DEGREE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashState {
    Growing,
    Contracting,
    Finished,
}

/// Horizontal light streak that stretches open, collapses, and removes
/// itself. Stepped once per rendered frame, not by the tween clock.
#[derive(Debug, Clone)]
pub struct HorizonFlash {
    node: NodeId,
    degree: f32,
    fast: f32,
    frame_budget: f32,
    state: FlashState,
}

impl HorizonFlash {
    /// Spawns the flash node and adds it to the scene.
    pub fn spawn(scene: &SceneGraph, config: FlashConfig) -> Self {
        let node = scene.spawn(SceneNode {
            color: FLASH_COLOR,
            ..SceneNode::new("openLightCircleObj", NodeKind::Flash)
        });
        scene.add(node);
        Self {
            node,
            degree: INITIAL_DEGREE,
            fast: config.fast,
            frame_budget: config.frame_budget,
            state: FlashState::Growing,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn degree(&self) -> f32 {
        self.degree
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == FlashState::Finished
    }

    /// Advances one frame. Returns `false` once the flash has finished.
    pub fn step(&mut self, scene: &SceneGraph) -> bool {
        if self.is_finished() {
            return false;
        }

        self.degree += self.fast * 20.0 / self.frame_budget;
        if self.degree > self.fast * 2.0 {
            self.state = FlashState::Finished;
            scene.remove(self.node);
            info!("horizon flash finished");
            return false;
        }

        let (x, y) = if self.degree < self.fast {
            self.state = FlashState::Growing;
            (self.degree / 4.0, self.degree)
        } else {
            self.state = FlashState::Contracting;
            (self.fast / 4.0, self.fast * 2.0 - self.degree)
        };
        scene.update(self.node, |node| {
            node.scale.x = x;
            node.scale.y = y;
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(scene: &SceneGraph, flash: &mut HorizonFlash) -> Vec<Vec3> {
        let mut scales = Vec::new();
        while flash.step(scene) {
            scales.push(scene.get(flash.node()).unwrap().scale);
            assert!(scales.len() < 10_000, "flash never finished");
        }
        scales
    }

    #[test]
    fn scale_rises_then_falls() {
        let scene = SceneGraph::new();
        let mut flash = HorizonFlash::spawn(&scene, FlashConfig::default());
        let ys: Vec<f32> = run_to_end(&scene, &mut flash).iter().map(|s| s.y).collect();

        let peak = ys
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(ys[..=peak].windows(2).all(|w| w[0] < w[1]));
        assert!(ys[peak..].windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ys[peak], 5.0);
    }

    #[test]
    fn width_follows_height_then_holds() {
        let scene = SceneGraph::new();
        let mut flash = HorizonFlash::spawn(&scene, FlashConfig::default());
        for scale in run_to_end(&scene, &mut flash) {
            if scale.x < 1.25 {
                assert!((scale.x - scale.y / 4.0).abs() < 1e-5);
            } else {
                assert_eq!(scale.x, 1.25);
            }
        }
    }

    #[test]
    fn terminates_and_detaches_exactly_once() {
        let scene = SceneGraph::new();
        let mut flash = HorizonFlash::spawn(&scene, FlashConfig::default());
        assert!(scene.is_attached(flash.node()));

        let frames = run_to_end(&scene, &mut flash).len();
        // 1.0 -> 10.0 in steps of 0.125, then one more step crosses the limit.
        assert_eq!(frames, 72);
        assert!(flash.is_finished());
        assert!(flash.degree() > 10.0);
        assert!(!scene.is_attached(flash.node()));

        let scale = scene.get(flash.node()).unwrap().scale;
        assert!(!flash.step(&scene));
        assert_eq!(scene.get(flash.node()).unwrap().scale, scale);
    }

    #[test]
    fn reports_phase_changes() {
        let scene = SceneGraph::new();
        let mut flash = HorizonFlash::spawn(&scene, FlashConfig::default());
        flash.step(&scene);
        assert_eq!(flash.state(), FlashState::Growing);
        while flash.degree() < 5.0 {
            flash.step(&scene);
        }
        assert_eq!(flash.state(), FlashState::Contracting);
    }
}
