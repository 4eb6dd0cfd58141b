use crate::ir::Tier;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which tier the visible graph starts at after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartDepth {
    #[default]
    Variables,
    Segments,
    Submodules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusConfig {
    pub variable: f32,
    pub segment: f32,
    pub submodule: f32,
    pub degree_scale: f32,
    pub max: f32,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            variable: 4.0,
            segment: 10.0,
            submodule: 18.0,
            degree_scale: 1.5,
            max: 48.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceConfig {
    pub ticks: usize,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub reheat_alpha: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub anchor_strength_submodule: f32,
    pub anchor_strength_segment: f32,
    pub anchor_strength_variable: f32,
    pub home_radius: f32,
    pub collide_multiplier: f32,
    pub collide_max: f32,
    pub collide_strength: f32,
    pub cluster_strength: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            ticks: 300,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            reheat_alpha: 0.3,
            link_distance: 30.0,
            link_strength: 1.0,
            anchor_strength_submodule: 0.3,
            anchor_strength_segment: 0.15,
            anchor_strength_variable: 0.05,
            home_radius: 320.0,
            collide_multiplier: 1.2,
            collide_max: 60.0,
            collide_strength: 0.7,
            cluster_strength: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborLayoutConfig {
    pub radius_scale: f32,
    pub relax_ticks: usize,
    pub column_strength: f32,
    pub row_strength: f32,
}

impl Default for NeighborLayoutConfig {
    fn default() -> Self {
        Self {
            radius_scale: 1.5,
            relax_ticks: 120,
            column_strength: 0.8,
            row_strength: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathLayoutConfig {
    pub gap_factor: f32,
}

impl Default for PathLayoutConfig {
    fn default() -> Self {
        Self { gap_factor: 6.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: f32,
    pub height: f32,
    pub radius: RadiusConfig,
    pub force: ForceConfig,
    pub neighbor: NeighborLayoutConfig,
    pub path: PathLayoutConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            radius: RadiusConfig::default(),
            force: ForceConfig::default(),
            neighbor: NeighborLayoutConfig::default(),
            path: PathLayoutConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn node_radius(&self, tier: Tier, degree: usize) -> f32 {
        let base = match tier {
            Tier::Variable => self.radius.variable,
            Tier::Segment => self.radius.segment,
            Tier::Submodule => self.radius.submodule,
        };
        (base + self.radius.degree_scale * (degree as f32).sqrt()).min(self.radius.max)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub start_depth: StartDepth,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RadiusConfigFile {
    variable: Option<NumberOrString>,
    segment: Option<NumberOrString>,
    submodule: Option<NumberOrString>,
    degree_scale: Option<NumberOrString>,
    max: Option<NumberOrString>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ForceConfigFile {
    ticks: Option<usize>,
    alpha_min: Option<f32>,
    velocity_decay: Option<f32>,
    reheat_alpha: Option<f32>,
    link_distance: Option<f32>,
    link_strength: Option<f32>,
    anchor_strength_submodule: Option<f32>,
    anchor_strength_segment: Option<f32>,
    anchor_strength_variable: Option<f32>,
    home_radius: Option<f32>,
    collide_multiplier: Option<f32>,
    collide_max: Option<f32>,
    collide_strength: Option<f32>,
    cluster_strength: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NeighborConfigFile {
    radius_scale: Option<f32>,
    relax_ticks: Option<usize>,
    column_strength: Option<f32>,
    row_strength: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeConfigFile {
    palette: Option<Vec<String>>,
    link_color: Option<String>,
    highlight_color: Option<String>,
    muted_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeConfigFile>,
    start_depth: Option<StartDepth>,
    width: Option<f32>,
    height: Option<f32>,
    radius: Option<RadiusConfigFile>,
    force: Option<ForceConfigFile>,
    neighbor: Option<NeighborConfigFile>,
    path_gap_factor: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlay a JSON5 config document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "muted" {
            config.theme = Theme::muted();
        } else if theme_name == "default" || theme_name == "vivid" {
            config.theme = Theme::vivid();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.palette
            && !v.is_empty()
        {
            config.theme.palette = v;
        }
        if let Some(v) = vars.link_color {
            config.theme.link_color = v;
        }
        if let Some(v) = vars.highlight_color {
            config.theme.highlight_color = v;
        }
        if let Some(v) = vars.muted_color {
            config.theme.muted_color = v;
        }
    }

    if let Some(v) = parsed.start_depth {
        config.start_depth = v;
    }
    if let Some(v) = parsed.width {
        config.layout.width = v;
    }
    if let Some(v) = parsed.height {
        config.layout.height = v;
    }
    if let Some(v) = parsed.path_gap_factor {
        config.layout.path.gap_factor = v;
    }

    if let Some(radius) = parsed.radius {
        if let Some(v) = radius.variable.as_ref().and_then(NumberOrString::as_f32) {
            config.layout.radius.variable = v;
        }
        if let Some(v) = radius.segment.as_ref().and_then(NumberOrString::as_f32) {
            config.layout.radius.segment = v;
        }
        if let Some(v) = radius.submodule.as_ref().and_then(NumberOrString::as_f32) {
            config.layout.radius.submodule = v;
        }
        if let Some(v) = radius.degree_scale.as_ref().and_then(NumberOrString::as_f32) {
            config.layout.radius.degree_scale = v;
        }
        if let Some(v) = radius.max.as_ref().and_then(NumberOrString::as_f32) {
            config.layout.radius.max = v;
        }
    }

    if let Some(force) = parsed.force {
        let target = &mut config.layout.force;
        if let Some(v) = force.ticks {
            target.ticks = v;
        }
        if let Some(v) = force.alpha_min {
            target.alpha_min = v;
        }
        if let Some(v) = force.velocity_decay {
            target.velocity_decay = v;
        }
        if let Some(v) = force.reheat_alpha {
            target.reheat_alpha = v;
        }
        if let Some(v) = force.link_distance {
            target.link_distance = v;
        }
        if let Some(v) = force.link_strength {
            target.link_strength = v;
        }
        if let Some(v) = force.anchor_strength_submodule {
            target.anchor_strength_submodule = v;
        }
        if let Some(v) = force.anchor_strength_segment {
            target.anchor_strength_segment = v;
        }
        if let Some(v) = force.anchor_strength_variable {
            target.anchor_strength_variable = v;
        }
        if let Some(v) = force.home_radius {
            target.home_radius = v;
        }
        if let Some(v) = force.collide_multiplier {
            target.collide_multiplier = v;
        }
        if let Some(v) = force.collide_max {
            target.collide_max = v;
        }
        if let Some(v) = force.collide_strength {
            target.collide_strength = v;
        }
        if let Some(v) = force.cluster_strength {
            target.cluster_strength = v;
        }
    }

    if let Some(neighbor) = parsed.neighbor {
        if let Some(v) = neighbor.radius_scale {
            config.layout.neighbor.radius_scale = v;
        }
        if let Some(v) = neighbor.relax_ticks {
            config.layout.neighbor.relax_ticks = v;
        }
        if let Some(v) = neighbor.column_strength {
            config.layout.neighbor.column_strength = v;
        }
        if let Some(v) = neighbor.row_strength {
            config.layout.neighbor.row_strength = v;
        }
    }

    Ok(config)
}
