//! Small span builders shared by the card, footer and help popup

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};

/// `[key] label` control. Disabled controls are drawn in the inactive color;
/// active (toggled on) controls are bold.
pub fn button(key: &str, label: impl Into<String>, enabled: bool, active: bool, accent: Color, inactive: Color) -> Vec<Span<'static>> {
    let label = label.into();

    if !enabled {
        let style = Style::default().fg(inactive);
        return vec![
            Span::styled(format!("[{}]", key), style),
            Span::styled(format!(" {}", label), style),
        ];
    }

    let label_style = if active {
        Style::default().fg(accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    vec![
        Span::styled(format!("[{}]", key), Style::default().fg(accent)),
        Span::styled(format!(" {}", label), label_style),
    ]
}

/// Footer legend entry: `key action │ `
pub fn key_hint(key: &'static str, action: &'static str, accent: Color, dim: Color) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(accent)),
        Span::styled(format!(" {} │ ", action), Style::default().fg(dim)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_button_is_inactive() {
        let spans = button("n", "New Verse", false, false, Color::Yellow, Color::DarkGray);

        assert_eq!(spans[0].content, "[n]");
        assert_eq!(spans[1].content, " New Verse");
        assert!(spans.iter().all(|s| s.style.fg == Some(Color::DarkGray)));
    }

    #[test]
    fn test_active_button_is_bold() {
        let spans = button("a", "Auto-refresh On", true, true, Color::Yellow, Color::DarkGray);

        assert_eq!(spans[0].style.fg, Some(Color::Yellow));
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    }
}
