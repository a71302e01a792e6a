use anyhow::Result;
use ratatui::style::{Color, Modifier, Style};
use std::fmt;
use tracing::debug;

use crate::db::Database;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Terminal light/dark hint from `COLORFGBG` ("fg;bg"). Background indices
/// 0-6 and 8 are dark colors in the standard 16-color table.
pub fn ambient_mode() -> Option<ThemeMode> {
    std::env::var("COLORFGBG").ok().and_then(|v| mode_from_colorfgbg(&v))
}

fn mode_from_colorfgbg(value: &str) -> Option<ThemeMode> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    match bg {
        0..=6 | 8 => Some(ThemeMode::Dark),
        7 | 9..=15 => Some(ThemeMode::Light),
        _ => None,
    }
}

/// Styles every view draws with. This is the root visual attribute of the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub mode: ThemeMode,
    pub base: Style,
    pub muted: Style,
    pub highlight: Style,
    pub accent: Style,
    pub error: Style,
}

impl Palette {
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Palette {
                mode,
                base: Style::default().fg(Color::Black).bg(Color::White),
                muted: Style::default().fg(Color::Gray).bg(Color::White),
                highlight: Style::default()
                    .bg(Color::LightBlue)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
                accent: Style::default().fg(Color::Blue).bg(Color::White),
                error: Style::default().fg(Color::Red).bg(Color::White),
            },
            ThemeMode::Dark => Palette {
                mode,
                base: Style::default().fg(Color::White).bg(Color::Black),
                muted: Style::default().fg(Color::DarkGray).bg(Color::Black),
                highlight: Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
                accent: Style::default().fg(Color::Cyan).bg(Color::Black),
                error: Style::default().fg(Color::LightRed).bg(Color::Black),
            },
        }
    }
}

pub struct ThemeStore<'a> {
    db: &'a Database,
    palette: Palette,
}

impl<'a> ThemeStore<'a> {
    /// Saved preference first, then the ambient hint, then light.
    pub fn load(db: &'a Database, ambient: Option<ThemeMode>) -> Result<Self> {
        let saved = db
            .get_preference(THEME_KEY)?
            .and_then(|value| ThemeMode::parse(&value));
        let mode = saved.or(ambient).unwrap_or(ThemeMode::Light);
        debug!(%mode, from_storage = saved.is_some(), "theme loaded");
        Ok(Self {
            db,
            palette: Palette::for_mode(mode),
        })
    }

    pub fn mode(&self) -> ThemeMode {
        self.palette.mode
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Persists the flipped mode, then applies it. A failed write changes nothing.
    pub fn toggle_theme(&mut self) -> Result<ThemeMode> {
        let next = self.mode().toggled();
        self.db.set_preference(THEME_KEY, next.as_str())?;
        self.palette = Palette::for_mode(next);
        debug!(mode = %next, "theme toggled");
        Ok(next)
    }
}
