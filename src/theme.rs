use serde::{Deserialize, Serialize};

use crate::ir::Tier;

const VIVID_PALETTE: [&str; 10] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];

const MUTED_PALETTE: [&str; 8] = [
    "#4E79A7", "#F28E2B", "#E15759", "#76B7B2", "#59A14F", "#EDC948", "#B07AA1", "#9C755F",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// One colour per submodule, cycled in load order.
    pub palette: Vec<String>,
    pub link_color: String,
    pub highlight_color: String,
    pub muted_color: String,
    pub background: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self::vivid()
    }
}

impl Theme {
    pub fn vivid() -> Self {
        Self {
            palette: VIVID_PALETTE.iter().map(|value| value.to_string()).collect(),
            link_color: "#999999".to_string(),
            highlight_color: "#E6550D".to_string(),
            muted_color: "#DDDDDD".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn muted() -> Self {
        Self {
            palette: MUTED_PALETTE.iter().map(|value| value.to_string()).collect(),
            link_color: "#B0B7C3".to_string(),
            highlight_color: "#C0392B".to_string(),
            muted_color: "#ECEFF3".to_string(),
            background: "#FAFBFC".to_string(),
        }
    }

    /// Submodules get the palette colour; lower tiers are progressively lighter.
    pub fn node_color(&self, submodule_index: usize, tier: Tier) -> String {
        if self.palette.is_empty() {
            return self.muted_color.clone();
        }
        let base = &self.palette[submodule_index % self.palette.len()];
        match tier {
            Tier::Submodule => base.clone(),
            Tier::Segment => lighten(base, 0.25),
            Tier::Variable => lighten(base, 0.5),
        }
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Mix a `#RRGGBB` colour with white. Non-hex colours pass through.
pub fn lighten(color: &str, amount: f32) -> String {
    let Some((r, g, b)) = parse_hex(color) else {
        return color.to_string();
    };
    let amount = amount.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let value = channel as f32 + (255.0 - channel as f32) * amount;
        value.round().clamp(0.0, 255.0) as u8
    };
    format!("#{:02X}{:02X}{:02X}", mix(r), mix(g), mix(b))
}
