use crate::error::{ChartError, Result};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThemeName {
    #[schemars(description = "Blue revenue, green profit, red cost on white. The fallback for unknown names.")]
    Default,

    #[schemars(description = "Muted navy, forest green and brick red for board decks.")]
    Corporate,

    #[schemars(description = "Light hues on a dark slate background.")]
    Dark,

    #[schemars(description = "System blue/green/red in the style of Apple investor presentations.")]
    Apple,

    #[schemars(description = "Indigo, emerald and red on an off-white background.")]
    Tech,

    #[schemars(description = "Traditional banking palette: deep navy, dark green, oxblood.")]
    Financial,

    #[schemars(description = "Grayscale with subtle green/red accents.")]
    Minimal,
}

impl ThemeName {
    pub const ALL: [ThemeName; 7] = [
        ThemeName::Default,
        ThemeName::Corporate,
        ThemeName::Dark,
        ThemeName::Apple,
        ThemeName::Tech,
        ThemeName::Financial,
        ThemeName::Minimal,
    ];

    /// Strict lookup. Returns `None` for names outside the fixed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "corporate" => Some(Self::Corporate),
            "dark" => Some(Self::Dark),
            "apple" => Some(Self::Apple),
            "tech" => Some(Self::Tech),
            "financial" => Some(Self::Financial),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Corporate => "corporate",
            Self::Dark => "dark",
            Self::Apple => "apple",
            Self::Tech => "tech",
            Self::Financial => "financial",
            Self::Minimal => "minimal",
        }
    }

    pub fn palette(&self) -> ThemePalette {
        match self {
            Self::Default => ThemePalette {
                name: "default",
                revenue: "#2E86AB",
                revenue_link: "rgba(46, 134, 171, 0.5)",
                profit: "#28A745",
                profit_link: "rgba(40, 167, 69, 0.5)",
                cost: "#DC3545",
                cost_link: "rgba(220, 53, 69, 0.5)",
                neutral: "#6C757D",
                neutral_link: "rgba(108, 117, 125, 0.5)",
                background: "#FFFFFF",
                text: "#333333",
                grid: "#E5E5E5",
                accent: "#17A2B8",
            },
            Self::Corporate => ThemePalette {
                name: "corporate",
                revenue: "#1B4F72",
                revenue_link: "rgba(27, 79, 114, 0.5)",
                profit: "#145A32",
                profit_link: "rgba(20, 90, 50, 0.5)",
                cost: "#922B21",
                cost_link: "rgba(146, 43, 33, 0.5)",
                neutral: "#566573",
                neutral_link: "rgba(86, 101, 115, 0.5)",
                background: "#FAFAFA",
                text: "#2C3E50",
                grid: "#D5D8DC",
                accent: "#2874A6",
            },
            Self::Dark => ThemePalette {
                name: "dark",
                revenue: "#5DADE2",
                revenue_link: "rgba(93, 173, 226, 0.5)",
                profit: "#58D68D",
                profit_link: "rgba(88, 214, 141, 0.5)",
                cost: "#EC7063",
                cost_link: "rgba(236, 112, 99, 0.5)",
                neutral: "#AEB6BF",
                neutral_link: "rgba(174, 182, 191, 0.5)",
                background: "#1C2833",
                text: "#ECF0F1",
                grid: "#34495E",
                accent: "#3498DB",
            },
            Self::Apple => ThemePalette {
                name: "apple",
                revenue: "#007AFF",
                revenue_link: "rgba(0, 122, 255, 0.5)",
                profit: "#34C759",
                profit_link: "rgba(52, 199, 89, 0.5)",
                cost: "#FF3B30",
                cost_link: "rgba(255, 59, 48, 0.5)",
                neutral: "#8E8E93",
                neutral_link: "rgba(142, 142, 147, 0.5)",
                background: "#FFFFFF",
                text: "#1D1D1F",
                grid: "#E5E5EA",
                accent: "#5856D6",
            },
            Self::Tech => ThemePalette {
                name: "tech",
                revenue: "#6366F1",
                revenue_link: "rgba(99, 102, 241, 0.5)",
                profit: "#10B981",
                profit_link: "rgba(16, 185, 129, 0.5)",
                cost: "#EF4444",
                cost_link: "rgba(239, 68, 68, 0.5)",
                neutral: "#9CA3AF",
                neutral_link: "rgba(156, 163, 175, 0.5)",
                background: "#F9FAFB",
                text: "#111827",
                grid: "#E5E7EB",
                accent: "#8B5CF6",
            },
            Self::Financial => ThemePalette {
                name: "financial",
                revenue: "#1E3A5F",
                revenue_link: "rgba(30, 58, 95, 0.5)",
                profit: "#2D5016",
                profit_link: "rgba(45, 80, 22, 0.5)",
                cost: "#7B1818",
                cost_link: "rgba(123, 24, 24, 0.5)",
                neutral: "#4A5568",
                neutral_link: "rgba(74, 85, 104, 0.5)",
                background: "#FFFFFF",
                text: "#1A202C",
                grid: "#CBD5E0",
                accent: "#2B6CB0",
            },
            Self::Minimal => ThemePalette {
                name: "minimal",
                revenue: "#374151",
                revenue_link: "rgba(55, 65, 81, 0.4)",
                profit: "#059669",
                profit_link: "rgba(5, 150, 105, 0.4)",
                cost: "#DC2626",
                cost_link: "rgba(220, 38, 38, 0.4)",
                neutral: "#9CA3AF",
                neutral_link: "rgba(156, 163, 175, 0.4)",
                background: "#FFFFFF",
                text: "#1F2937",
                grid: "#F3F4F6",
                accent: "#4B5563",
            },
        }
    }
}

/// Semantic color slot of a [`ThemePalette`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRole {
    /// Primary hue: revenue bars and nodes, waterfall totals.
    Revenue,
    /// Positive hue: profit subtotals, increases.
    Profit,
    /// Negative hue: costs, decreases, losses.
    Cost,
    Neutral,
    /// Secondary hue.
    Accent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemePalette {
    pub name: &'static str,
    pub revenue: &'static str,
    pub revenue_link: &'static str,
    pub profit: &'static str,
    pub profit_link: &'static str,
    pub cost: &'static str,
    pub cost_link: &'static str,
    pub neutral: &'static str,
    pub neutral_link: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
    pub accent: &'static str,
}

impl ThemePalette {
    pub fn color(&self, role: ColorRole) -> &'static str {
        match role {
            ColorRole::Revenue => self.revenue,
            ColorRole::Profit => self.profit,
            ColorRole::Cost => self.cost,
            ColorRole::Neutral => self.neutral,
            ColorRole::Accent => self.accent,
        }
    }

    /// Semi-transparent variant used for Sankey links. The accent slot has no
    /// stored link color, so it shares the neutral one.
    pub fn link_color(&self, role: ColorRole) -> &'static str {
        match role {
            ColorRole::Revenue => self.revenue_link,
            ColorRole::Profit => self.profit_link,
            ColorRole::Cost => self.cost_link,
            ColorRole::Neutral | ColorRole::Accent => self.neutral_link,
        }
    }
}

impl Default for ThemePalette {
    fn default() -> Self {
        ThemeName::Default.palette()
    }
}

/// Resolves a theme by name. Unknown names fall back to `default` instead of
/// failing, so a typo in a chart request still renders.
pub fn get_theme(name: &str) -> ThemePalette {
    match ThemeName::from_name(name) {
        Some(theme) => theme.palette(),
        None => {
            debug!("Unknown theme '{}', falling back to default", name);
            ThemeName::Default.palette()
        }
    }
}

pub fn list_themes() -> Vec<&'static str> {
    ThemeName::ALL.iter().map(|t| t.as_str()).collect()
}

/// Ordered colors for multi-series charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPalette {
    pub name: &'static str,
    pub colors: [&'static str; 6],
}

impl SeriesPalette {
    /// Color for the i-th series, cycling when there are more series than colors.
    pub fn color_at(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }
}

const SERIES_PALETTES: [SeriesPalette; 5] = [
    SeriesPalette {
        name: "default",
        colors: ["#2E86AB", "#A23B72", "#F18F01", "#C73E1D", "#3B1F2B", "#95C623"],
    },
    SeriesPalette {
        name: "corporate",
        colors: ["#1B4F72", "#145A32", "#922B21", "#6C3483", "#7E5109", "#1A5276"],
    },
    SeriesPalette {
        name: "tech",
        colors: ["#6366F1", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#06B6D4"],
    },
    SeriesPalette {
        name: "pastel",
        colors: ["#A8DADC", "#F4A261", "#E76F51", "#2A9D8F", "#E9C46A", "#264653"],
    },
    SeriesPalette {
        name: "vibrant",
        colors: ["#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD"],
    },
];

pub fn get_palette(name: &str) -> SeriesPalette {
    let wanted = name.trim().to_ascii_lowercase();
    SERIES_PALETTES
        .iter()
        .find(|p| p.name == wanted)
        .copied()
        .unwrap_or_else(|| {
            debug!("Unknown series palette '{}', falling back to default", name);
            SERIES_PALETTES[0]
        })
}

pub fn list_palettes() -> Vec<&'static str> {
    SERIES_PALETTES.iter().map(|p| p.name).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_rgba(&self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }

    fn lerp(&self, other: &Rgb, ratio: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * ratio) as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

/// Linear gradient between two hex colors, as `rgba(...)` strings.
pub fn gradient_colors(start: &str, end: &str, steps: usize, alpha: f64) -> Result<Vec<String>> {
    let parse = |hex: &str| {
        Rgb::from_hex(hex).ok_or_else(|| {
            ChartError::input_shape("gradient", format!("'{}' is not a #RRGGBB color", hex))
        })
    };
    let from = parse(start)?;
    let to = parse(end)?;

    let colors = (0..steps)
        .map(|i| {
            let ratio = if steps > 1 {
                i as f64 / (steps - 1) as f64
            } else {
                0.0
            };
            from.lerp(&to, ratio).to_rgba(alpha)
        })
        .collect();

    Ok(colors)
}
