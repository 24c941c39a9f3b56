use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use log::info;

use crate::hexfield::HexField;
use crate::scene::SceneGraph;
use crate::scheduler::Scheduler;
use crate::tween::{AnimationEngine, Property, Tween, TweenTarget};

pub const DISPERSE_COLOR: Vec3 = Vec3::ONE;
pub const FADE_OUT_DELAY_MS: f64 = 500.0;

const FLASH_WHITE_MS: f64 = 10.0;
const FADE_OUT_MS: f64 = 10.0;

/// Queues the disperse phase to fire once, `after_ms` from now.
pub fn schedule_disperse<E>(
    scheduler: &mut Scheduler<E>,
    scene: &SceneGraph,
    field: &HexField,
    after_ms: f64,
) -> f64
where
    E: AnimationEngine + 'static,
{
    let scene = scene.clone();
    let field = field.clone();
    scheduler.schedule("disperse", after_ms, move |engine| {
        disperse(engine, &scene, &field);
    })
}

/// Flashes every element white, fades it out after a short hold and
/// unlinks the field root from `scene` once the last fade finishes.
///
/// Color and opacity tweens still queued or running on the field are
/// dropped first so an unfinished reveal cannot overwrite the fade.
/// Returns the number of tweens scheduled.
pub fn disperse<E>(engine: &mut E, scene: &SceneGraph, field: &HexField) -> usize
where
    E: AnimationEngine + ?Sized,
{
    let elements: Vec<_> = field.elements().collect();
    let cancelled = engine.cancel_where(&mut |tween| {
        matches!(tween.property(), Property::Color | Property::Opacity) && elements.contains(&tween.node)
    });
    if cancelled > 0 {
        info!("disperse dropped {cancelled} unfinished reveal tween(s)");
    }

    let root = field.root;
    if elements.is_empty() {
        scene.remove(root);
        info!("disperse found an empty field; detached it immediately");
        return 0;
    }

    let remaining = Rc::new(Cell::new(elements.len()));
    for &node in &elements {
        engine.schedule(Tween::to(node, TweenTarget::Color(DISPERSE_COLOR), FLASH_WHITE_MS));
        let fade = engine.schedule(
            Tween::to(node, TweenTarget::Opacity(0.0), FADE_OUT_MS).delay(FADE_OUT_DELAY_MS),
        );

        let remaining = Rc::clone(&remaining);
        let scene = scene.clone();
        engine.on_complete(
            fade,
            Box::new(move || {
                remaining.set(remaining.get().saturating_sub(1));
                if remaining.get() == 0 && scene.remove(root) {
                    info!("hexagon field detached from scene");
                }
            }),
        );
    }

    info!("disperse started for {} element(s)", elements.len());
    elements.len() * 2
}
