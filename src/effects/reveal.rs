use glam::Vec3;
use log::info;
use rand::Rng;

use crate::hexfield::HexField;
use crate::scene::NodeId;
use crate::tween::{AnimationEngine, Easing, Tween, TweenTarget};

/// Delay between consecutive clusters starting their reveal.
pub const STAGGER_MS: f64 = 50.0;
pub const REVEAL_OPACITY: f32 = 0.9;
/// Warm gold the elements settle on (`#ffd866`).
pub const REVEAL_COLOR: Vec3 = Vec3::new(1.0, 216.0 / 255.0, 0.4);

const SCATTER_MS: f64 = 2000.0;
const FADE_IN_MS: f64 = 300.0;
const SETTLE_MS: f64 = 2000.0;
const WARM_MS: f64 = 1000.0;

/// Where one element was sent and when it leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTarget {
    pub cluster: usize,
    pub node: NodeId,
    pub target: Vec3,
    pub delay_ms: f64,
}

/// Schedules the staggered reveal of every element with the default stagger.
pub fn reveal<E, R>(engine: &mut E, rng: &mut R, field: &HexField, base_delay_ms: f64) -> Vec<RevealTarget>
where
    E: AnimationEngine + ?Sized,
    R: Rng + ?Sized,
{
    reveal_staggered(engine, rng, field, base_delay_ms, STAGGER_MS)
}

/// Schedules, for each element, a scatter towards a random far point, a
/// quick fade-in, a scale settle to 1 and a warm color shift. All four
/// start together at `index * stagger_ms + base_delay_ms`.
///
/// Calling this again layers new tweens over any still running.
pub fn reveal_staggered<E, R>(
    engine: &mut E,
    rng: &mut R,
    field: &HexField,
    base_delay_ms: f64,
    stagger_ms: f64,
) -> Vec<RevealTarget>
where
    E: AnimationEngine + ?Sized,
    R: Rng + ?Sized,
{
    let mut targets = Vec::with_capacity(field.element_count());

    for (index, cluster) in field.clusters.iter().enumerate() {
        let delay_ms = index as f64 * stagger_ms + base_delay_ms;
        for node in cluster.elements() {
            let target = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(100.0..2100.0),
            );

            engine.schedule(
                Tween::to(node, TweenTarget::Position(target), SCATTER_MS)
                    .delay(delay_ms)
                    .easing(Easing::CubicIn),
            );
            engine.schedule(
                Tween::to(node, TweenTarget::Opacity(REVEAL_OPACITY), FADE_IN_MS)
                    .delay(delay_ms)
                    .easing(Easing::CubicOut),
            );
            engine.schedule(Tween::to(node, TweenTarget::Scale(Vec3::ONE), SETTLE_MS).delay(delay_ms));
            engine.schedule(Tween::to(node, TweenTarget::Color(REVEAL_COLOR), WARM_MS).delay(delay_ms));

            targets.push(RevealTarget {
                cluster: index,
                node,
                target,
                delay_ms,
            });
        }
    }

    info!(
        "reveal scheduled for {} element(s) starting in {base_delay_ms}ms",
        targets.len()
    );
    targets
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::hexfield::generate;
    use crate::scene::SceneGraph;
    use crate::tween::TweenEngine;

    fn setup(count: usize) -> (SceneGraph, HexField, TweenEngine, StdRng) {
        let scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(11);
        let field = generate(&scene, &mut rng, count);
        let engine = TweenEngine::new(scene.clone());
        (scene, field, engine, rng)
    }

    #[test]
    fn schedules_four_tweens_per_element() {
        let (_scene, field, mut engine, mut rng) = setup(5);
        let targets = reveal(&mut engine, &mut rng, &field, 1000.0);
        assert_eq!(targets.len(), 10);
        assert_eq!(engine.active_count(), 40);
    }

    #[test]
    fn delays_grow_with_cluster_index() {
        let (_scene, field, mut engine, mut rng) = setup(20);
        let targets = reveal(&mut engine, &mut rng, &field, 1000.0);
        for pair in targets.windows(2) {
            assert!(pair[0].cluster <= pair[1].cluster);
            assert!(pair[0].delay_ms <= pair[1].delay_ms);
        }
        assert_eq!(targets[0].delay_ms, 1000.0);
        assert_eq!(targets.last().unwrap().delay_ms, 1000.0 + 19.0 * STAGGER_MS);
    }

    #[test]
    fn targets_fall_in_scatter_box() {
        let (_scene, field, mut engine, mut rng) = setup(30);
        for sent in reveal(&mut engine, &mut rng, &field, 0.0) {
            assert!((-15.0..=15.0).contains(&sent.target.x));
            assert!((-10.0..=10.0).contains(&sent.target.y));
            assert!((100.0..=2100.0).contains(&sent.target.z));
        }
    }

    #[test]
    fn nothing_moves_before_the_base_delay() {
        let (scene, field, mut engine, mut rng) = setup(3);
        let before: Vec<_> = field.elements().map(|e| scene.get(e).unwrap()).collect();
        reveal(&mut engine, &mut rng, &field, 1000.0);
        engine.advance(999.0);
        let after: Vec<_> = field.elements().map(|e| scene.get(e).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn elements_settle_on_their_targets() {
        let (scene, field, mut engine, mut rng) = setup(50);
        let targets = reveal(&mut engine, &mut rng, &field, 1000.0);

        let mut now = 0.0;
        while now < 1000.0 + 49.0 * STAGGER_MS + SCATTER_MS {
            engine.advance(1000.0 / 60.0);
            now += 1000.0 / 60.0;
            for element in field.elements() {
                let node = scene.get(element).unwrap();
                assert!((0.0..=1.0).contains(&node.opacity));
                assert!(node.color.min_element() >= 0.0 && node.color.max_element() <= 1.0);
            }
        }
        engine.advance(1.0);

        for sent in &targets {
            let node = scene.get(sent.node).unwrap();
            assert_eq!(node.position, sent.target);
            assert_eq!(node.opacity, REVEAL_OPACITY);
            assert_eq!(node.scale, Vec3::ONE);
            assert_eq!(node.color, REVEAL_COLOR);
        }
        assert!(engine.is_idle());
    }

    #[test]
    fn empty_field_schedules_nothing() {
        let (_scene, field, mut engine, mut rng) = setup(0);
        assert!(reveal(&mut engine, &mut rng, &field, 1000.0).is_empty());
        assert!(engine.is_idle());
    }
}
