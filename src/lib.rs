//! Headless runtime for the "opening glow" scene effect.
//!
//! A field of paired hexagon discs is generated on a spherical shell,
//! revealed with a staggered wave of tweens, flashed white and faded out,
//! while a horizon light streak pulses open and closed alongside it.
//! Rendering stays outside of the crate: [`SceneContext`] owns the scene
//! state and is advanced one frame at a time, so the whole effect can be
//! simulated and tested without a GPU.

pub mod app;
pub mod camera;
pub mod config;
pub mod effects;
pub mod hexfield;
pub mod scene;
pub mod scheduler;
pub mod tween;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use app::{FrameClock, SceneContext, StateSummary};
pub use camera::Camera;
pub use config::{ConfigError, EffectConfig, FlashConfig, HexagonConfig};
pub use effects::{schedule_disperse, FlashState, HorizonFlash, RevealTarget};
pub use hexfield::{generate, HexCluster, HexField};
pub use scene::{NodeId, NodeKind, SceneGraph, SceneNode};
pub use scheduler::Scheduler;
pub use tween::{AnimationEngine, Easing, Property, Tween, TweenEngine, TweenHandle, TweenTarget};
