#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use js_sys::Float32Array;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::window;

use crate::app::{FrameClock, SceneContext};
use crate::config::EffectConfig;
use crate::scene::NodeKind;

/// Floats per instance in [`WasmEffect::instances`]: position, rotation
/// quaternion, scale, rgb and opacity.
pub const INSTANCE_STRIDE: usize = 14;

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Browser handle to the effect. The page draws the packed instance data
/// every frame; the effect advances itself from `requestAnimationFrame`.
#[wasm_bindgen]
pub struct WasmEffect {
    inner: Rc<RefCell<EffectState>>,
}

#[wasm_bindgen]
impl WasmEffect {
    #[wasm_bindgen(constructor)]
    pub fn new(config_xml: Option<String>, seed: f64) -> Result<WasmEffect, JsValue> {
        let config = match config_xml {
            Some(xml) => EffectConfig::from_xml(&xml)
                .map_err(|err| JsValue::from_str(&format!("invalid effect config: {err}")))?,
            None => EffectConfig::default(),
        };
        let seed = config.seed.unwrap_or(seed as u64);
        let context = SceneContext::init(config, seed);
        Ok(Self {
            inner: Rc::new(RefCell::new(EffectState {
                context,
                clock: FrameClock::new(),
                animation_closure: None,
            })),
        })
    }

    /// Starts the frame loop. Does nothing while a loop is already running.
    pub fn start(&self) -> Result<(), JsValue> {
        if !self.inner.borrow_mut().clock.begin() {
            return Ok(());
        }
        schedule_animation_loop(Rc::clone(&self.inner)).map_err(|err| {
            self.inner.borrow_mut().clock.finish();
            JsValue::from_str(&err.to_string())
        })
    }

    /// Visible hexagons and flash, `INSTANCE_STRIDE` floats each.
    pub fn instances(&self) -> Float32Array {
        let state = self.inner.borrow();
        let data = pack_instances(&state.context);
        Float32Array::from(data.as_slice())
    }

    #[wasm_bindgen(js_name = viewProjection)]
    pub fn view_projection(&self, aspect: f32) -> Float32Array {
        let state = self.inner.borrow();
        let matrix = state.context.camera().view_proj(aspect).to_cols_array();
        Float32Array::from(&matrix[..])
    }

    #[wasm_bindgen(js_name = isSettled)]
    pub fn is_settled(&self) -> bool {
        self.inner.borrow().context.is_settled()
    }

    /// Stops the effect. A frame already requested still runs, finds the
    /// context settled and ends the loop, so its closure stays alive.
    pub fn dispose(&self) {
        self.inner.borrow_mut().context.dispose();
    }
}

struct EffectState {
    context: SceneContext,
    clock: FrameClock,
    animation_closure: Option<Closure<dyn FnMut(f64)>>,
}

impl EffectState {
    /// Runs one frame and reports whether the loop should continue.
    fn frame(&mut self, timestamp: f64) -> bool {
        let dt = self.clock.delta(timestamp);
        self.context.tick(dt);
        if self.context.is_settled() {
            self.clock.finish();
            return false;
        }
        true
    }
}

fn schedule_animation_loop(app: Rc<RefCell<EffectState>>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let mut state = app.borrow_mut();
    let app_clone = Rc::clone(&app);

    let closure = Closure::wrap(Box::new(move |timestamp: f64| {
        let keep_running = app_clone.borrow_mut().frame(timestamp);
        if !keep_running {
            log::info!("effect settled; stopping animation loop");
            return;
        }
        if let Err(err) = schedule_animation_loop(Rc::clone(&app_clone)) {
            app_clone.borrow_mut().clock.finish();
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
        }
    }) as Box<dyn FnMut(f64)>);

    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;

    state.animation_closure = Some(closure);
    Ok(())
}

fn pack_instances(context: &SceneContext) -> Vec<f32> {
    let scene = context.scene();
    let mut data = Vec::new();
    for root in scene.roots() {
        for id in scene.descendants(root) {
            let Some(node) = scene.get(id) else {
                continue;
            };
            if node.kind == NodeKind::Group || node.opacity <= 0.0 {
                continue;
            }
            data.extend_from_slice(&node.position.to_array());
            data.extend_from_slice(&node.rotation.to_array());
            data.extend_from_slice(&node.scale.to_array());
            data.extend_from_slice(&node.color.to_array());
            data.push(node.opacity);
        }
    }
    data
}
