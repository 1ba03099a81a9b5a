//! Card colors, taken from the user's kitty theme when one is available
//! (~/.config/kitty/current-theme.conf, then ~/.config/kitty/kitty.conf)

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,   // Card border, citation, active controls
    pub danger: Color,   // Error message
    pub text: Color,     // Verse text
    pub text_dim: Color, // Translation name, notes, stale verse
    pub inactive: Color, // Disabled controls
    pub header: Color,   // Card title
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(250, 179, 135),
            danger: Color::Rgb(243, 139, 168),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(245, 194, 231),
        }
    }
}

impl Theme {
    pub fn load() -> Self {
        Self::load_kitty_theme().unwrap_or_default()
    }

    fn load_kitty_theme() -> Option<Self> {
        let kitty_dir = dirs::config_dir()?.join("kitty");

        ["current-theme.conf", "kitty.conf"]
            .iter()
            .filter_map(|name| fs::read_to_string(kitty_dir.join(name)).ok())
            .find_map(|content| Self::from_kitty_conf(&content))
    }

    /// Map a kitty color scheme onto the card palette
    fn from_kitty_conf(content: &str) -> Option<Self> {
        let colors = Self::parse_kitty_conf(content);
        if colors.is_empty() {
            return None;
        }

        let fallback = Self::default();
        let pick = |keys: &[&str], default: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k).copied())
                .unwrap_or(default)
        };

        Some(Self {
            accent: pick(&["color3", "color11"], fallback.accent),
            danger: pick(&["color1", "color9"], fallback.danger),
            text: pick(&["foreground"], fallback.text),
            text_dim: pick(&["color8"], fallback.text_dim),
            inactive: pick(&["inactive_border_color", "color0"], fallback.inactive),
            header: pick(&["color5", "color13"], fallback.header),
        })
    }

    /// Parse `key #hexcolor` lines, skipping comments and non-color values
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(char::is_whitespace))
            .filter_map(|(key, value)| Some((key.to_string(), Self::parse_hex_color(value)?)))
            .collect()
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let hex = s.trim().strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();

        match hex.len() {
            6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => Some(Color::Rgb(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
            )),
            _ => None,
        }
    }
}
