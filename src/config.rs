use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hexfield::DEFAULT_HEXAGON_COUNT;

/// Shortest frame the simulation accepts, in milliseconds.
pub const MIN_FRAME_MS: f64 = 0.001;

/// Errors raised while reading an effect description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid effect XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected <effect> root element, found <{0}>")]
    UnexpectedRoot(String),
    #[error("<{tag}> is not a valid number: {value:?}")]
    InvalidNumber { tag: String, value: String },
    #[error("<{tag}> is not a valid boolean: {value:?}")]
    InvalidBool { tag: String, value: String },
    #[error("<{tag}> vector is missing components")]
    MissingComponents { tag: String },
    #[error("<{tag}> must be {requirement}, got {value}")]
    OutOfRange {
        tag: String,
        requirement: &'static str,
        value: f64,
    },
}

/// Parameters of the opening effect.
///
/// Every field has a default matching the shipped scene, so an empty
/// `<effect/>` document yields [`EffectConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,
    #[serde(default)]
    pub look_at_camera: bool,
    #[serde(default = "default_camera_position")]
    pub camera_position: Vec3,
    #[serde(default)]
    pub hexagons: HexagonConfig,
    #[serde(default)]
    pub flash: FlashConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexagonConfig {
    pub count: usize,
    pub reveal_delay_ms: f64,
    pub stagger_ms: f64,
    pub disperse_after_ms: f64,
}

impl Default for HexagonConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_HEXAGON_COUNT,
            reveal_delay_ms: 1000.0,
            stagger_ms: 50.0,
            disperse_after_ms: 5000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashConfig {
    pub fast: f32,
    pub frame_budget: f32,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            fast: 5.0,
            frame_budget: 800.0,
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            seed: None,
            frame_ms: default_frame_ms(),
            duration_ms: default_duration_ms(),
            look_at_camera: false,
            camera_position: default_camera_position(),
            hexagons: HexagonConfig::default(),
            flash: FlashConfig::default(),
        }
    }
}

fn default_frame_ms() -> f64 {
    1000.0 / 60.0
}

fn default_duration_ms() -> f64 {
    7000.0
}

fn default_camera_position() -> Vec3 {
    Vec3::new(0.0, 0.0, 5.0)
}

impl EffectConfig {
    /// Parses an `<effect>` document. Missing tags keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self, ConfigError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        if !root.has_tag_name("effect") {
            return Err(ConfigError::UnexpectedRoot(
                root.tag_name().name().to_string(),
            ));
        }

        let mut config = Self::default();
        if let Some(seed) = optional_text(&root, "seed") {
            let parsed = seed.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                tag: "seed".into(),
                value: seed.clone(),
            })?;
            config.seed = Some(parsed);
        }
        config.frame_ms = parse_f64(&root, "frame-ms", config.frame_ms)?;
        config.duration_ms = parse_f64(&root, "duration", config.duration_ms)?;
        config.look_at_camera = parse_bool(&root, "look-at-camera", config.look_at_camera)?;

        if let Some(camera) = child(&root, "camera") {
            config.camera_position = parse_vec3(&camera, "position", config.camera_position)?;
        }

        if let Some(hexagons) = child(&root, "hexagons") {
            let defaults = config.hexagons;
            let count = parse_f64(&hexagons, "count", defaults.count as f64)?;
            if count < 0.0 || count.fract() != 0.0 {
                return Err(ConfigError::OutOfRange {
                    tag: "count".into(),
                    requirement: "a non-negative integer",
                    value: count,
                });
            }
            config.hexagons = HexagonConfig {
                count: count as usize,
                reveal_delay_ms: parse_f64(&hexagons, "reveal-delay", defaults.reveal_delay_ms)?,
                stagger_ms: parse_f64(&hexagons, "stagger", defaults.stagger_ms)?,
                disperse_after_ms: parse_f64(
                    &hexagons,
                    "disperse-after",
                    defaults.disperse_after_ms,
                )?,
            };
        }

        if let Some(flash) = child(&root, "flash") {
            let defaults = config.flash;
            config.flash = FlashConfig {
                fast: parse_f64(&flash, "fast", defaults.fast as f64)? as f32,
                frame_budget: parse_f64(&flash, "frame-budget", defaults.frame_budget as f64)?
                    as f32,
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the numeric ranges the animators rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_ms.is_finite() && self.frame_ms >= MIN_FRAME_MS) {
            return Err(ConfigError::OutOfRange {
                tag: "frame-ms".into(),
                requirement: "at least 0.001",
                value: self.frame_ms,
            });
        }
        require_non_negative("duration", self.duration_ms)?;
        require_non_negative("reveal-delay", self.hexagons.reveal_delay_ms)?;
        require_non_negative("stagger", self.hexagons.stagger_ms)?;
        require_non_negative("disperse-after", self.hexagons.disperse_after_ms)?;
        require_positive("fast", self.flash.fast as f64)?;
        require_positive("frame-budget", self.flash.frame_budget as f64)?;
        Ok(())
    }
}

fn require_positive(tag: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            tag: tag.into(),
            requirement: "greater than zero",
            value,
        })
    }
}

fn require_non_negative(tag: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            tag: tag.into(),
            requirement: "zero or greater",
            value,
        })
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_f64(node: &Node<'_, '_>, tag: &str, default: f64) -> Result<f64, ConfigError> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidNumber {
                tag: tag.into(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_bool(node: &Node<'_, '_>, tag: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_text(node, tag).as_deref() {
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidBool {
            tag: tag.into(),
            value: other.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_vec3(node: &Node<'_, '_>, tag: &str, default: Vec3) -> Result<Vec3, ConfigError> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(default);
    };
    let mut numbers = value.split_whitespace().map(|component| {
        component
            .parse::<f32>()
            .map_err(|_| ConfigError::InvalidNumber {
                tag: tag.into(),
                value: value.clone(),
            })
    });
    let mut next = || {
        numbers.next().unwrap_or_else(|| {
            Err(ConfigError::MissingComponents { tag: tag.into() })
        })
    };
    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Vec3::new(x, y, z))
}
