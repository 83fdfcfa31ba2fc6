use crate::model::LayerKind;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    pub annotation: Style,
    pub plot: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().red().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            annotation: Style::new().cyan(),
            plot: Style::new().bright_red(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            annotation: Style::new(),
            plot: Style::new(),
        }
    }

    /// Data-bearing layers are highlighted, decoration is muted
    pub fn layer(&self, kind: LayerKind) -> Style {
        match kind {
            LayerKind::Data | LayerKind::LineArrow => self.plot.clone(),
            LayerKind::Text => self.annotation.clone(),
            LayerKind::Core | LayerKind::Grid => self.muted.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
