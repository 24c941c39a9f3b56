//! Procedural field of paired hexagon discs.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use log::info;
use rand::Rng;

use crate::scene::{NodeId, NodeKind, SceneGraph, SceneNode};

pub const DEFAULT_HEXAGON_COUNT: usize = 50;

/// Tint every element starts with before the reveal warms it up.
pub const INITIAL_COLOR: Vec3 = Vec3::new(0.8, 0.75, 0.3);

const SCALE_RANGE: (f32, f32) = (0.10, 0.30);
const JITTER: f32 = 0.00025;
const RADIAL_RANGE: (f32, f32) = (1.0, 3.0);

/// A front/back pair of hexagon elements sharing one set of random draws.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCluster {
    pub node: NodeId,
    pub front: NodeId,
    pub back: NodeId,
    pub scale: f32,
    pub jitter: Vec3,
    pub radial_distance: f32,
}

impl HexCluster {
    pub fn elements(&self) -> [NodeId; 2] {
        [self.front, self.back]
    }
}

/// Ordered clusters hanging from one root node. Cluster order is the
/// stagger order used by the reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct HexField {
    pub root: NodeId,
    pub clusters: Vec<HexCluster>,
}

impl HexField {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Every element node, cluster by cluster, front before back.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.clusters.iter().flat_map(HexCluster::elements)
    }

    pub fn element_count(&self) -> usize {
        self.clusters.len() * 2
    }
}

/// Builds `count` clusters under a new root and adds the root to the scene.
///
/// Each cluster draws a uniform scale, a tiny positional jitter and a
/// radial distance. Both elements sit at `normalize(jitter) * radial`, so
/// the jitter only contributes a direction. The back element is turned
/// half a revolution about its local X axis.
pub fn generate<R: Rng + ?Sized>(scene: &SceneGraph, rng: &mut R, count: usize) -> HexField {
    let root = scene.spawn(SceneNode::group("hexagonObjs"));
    let mut clusters = Vec::with_capacity(count);

    for index in 0..count {
        let scale = rng.gen_range(SCALE_RANGE.0..=SCALE_RANGE.1);
        let jitter = Vec3::new(
            rng.gen_range(-JITTER..=JITTER),
            rng.gen_range(-JITTER..=JITTER),
            rng.gen_range(-JITTER..=JITTER),
        );
        let radial_distance = rng.gen_range(RADIAL_RANGE.0..=RADIAL_RANGE.1);
        let position = jitter.try_normalize().unwrap_or(Vec3::Z) * radial_distance;

        let node = scene.spawn(SceneNode::group(format!("hexagonObj-{index}")));
        let front = scene.spawn(hexagon(format!("hexagon-{index}-front"), position, scale, Quat::IDENTITY));
        let back = scene.spawn(hexagon(
            format!("hexagon-{index}-back"),
            position,
            scale,
            Quat::from_rotation_x(PI),
        ));
        scene.attach_child(node, front);
        scene.attach_child(node, back);
        scene.attach_child(root, node);

        clusters.push(HexCluster {
            node,
            front,
            back,
            scale,
            jitter,
            radial_distance,
        });
    }

    scene.add(root);
    info!("generated {count} hexagon clusters ({} elements)", count * 2);
    HexField { root, clusters }
}

fn hexagon(name: String, position: Vec3, scale: f32, rotation: Quat) -> SceneNode {
    SceneNode {
        position,
        rotation,
        scale: Vec3::splat(scale),
        opacity: 0.0,
        color: INITIAL_COLOR,
        ..SceneNode::new(name, NodeKind::Hexagon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field(count: usize) -> (SceneGraph, HexField) {
        let scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(7);
        let field = generate(&scene, &mut rng, count);
        (scene, field)
    }

    #[test]
    fn generates_requested_cluster_count() {
        for count in [0, 1, DEFAULT_HEXAGON_COUNT] {
            let (scene, field) = field(count);
            assert_eq!(field.len(), count);
            assert_eq!(field.element_count(), count * 2);
            for cluster in &field.clusters {
                assert_eq!(scene.children(cluster.node), vec![cluster.front, cluster.back]);
            }
            for element in field.elements() {
                let node = scene.get(element).unwrap();
                assert_eq!(node.opacity, 0.0);
                assert_eq!(node.color, INITIAL_COLOR);
            }
        }
    }

    #[test]
    fn elements_sit_on_radial_shell() {
        let (scene, field) = field(DEFAULT_HEXAGON_COUNT);
        for cluster in &field.clusters {
            assert!((1.0..=3.0).contains(&cluster.radial_distance));
            assert!((0.10..=0.30).contains(&cluster.scale));
            assert!(cluster.jitter.abs().max_element() <= JITTER);
            for element in cluster.elements() {
                let node = scene.get(element).unwrap();
                assert!((node.position.length() - cluster.radial_distance).abs() < 1e-4);
                assert_eq!(node.scale, Vec3::splat(cluster.scale));
            }
        }
    }

    #[test]
    fn pair_shares_transform_but_back_is_flipped() {
        let (scene, field) = field(4);
        for cluster in &field.clusters {
            let front = scene.get(cluster.front).unwrap();
            let back = scene.get(cluster.back).unwrap();
            assert_eq!(front.position, back.position);
            assert_eq!(front.rotation, Quat::IDENTITY);
            assert!((back.rotation * Vec3::Z).abs_diff_eq(-Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn root_is_attached_after_generation() {
        let (scene, field) = field(3);
        assert_eq!(scene.roots(), vec![field.root]);
        assert!(field.elements().all(|element| scene.is_attached(element)));
    }
}
