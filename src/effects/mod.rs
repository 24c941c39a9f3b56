//! Timed visual phases of the opening effect.
//!
//! The reveal and disperse phases queue work on the tween engine
//! ([`AnimationEngine`](crate::tween::AnimationEngine)); the horizon flash is
//! stepped directly by the frame loop and never touches the tween clock.

mod disperse;
mod flash;
mod reveal;

pub use disperse::{disperse, schedule_disperse, DISPERSE_COLOR, FADE_OUT_DELAY_MS};
pub use flash::{FlashState, HorizonFlash, FLASH_COLOR};
pub use reveal::{reveal, reveal_staggered, RevealTarget, REVEAL_COLOR, REVEAL_OPACITY, STAGGER_MS};
