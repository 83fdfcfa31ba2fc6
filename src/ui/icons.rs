use crate::model::LayerKind;

pub struct Icons;

impl Icons {
    pub const ROSE: &str = "🌹";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const DATABASE: &str = "🗄️";
    pub const TABLE: &str = "📋";
    pub const COLUMN: &str = "📐";
    pub const STATS: &str = "📊";
    pub const LAYERS: &str = "🗂️";
    pub const TEXT: &str = "🔤";
    pub const ARROW: &str = "➡️";
    pub const CORE: &str = "⭕";
    pub const GRID: &str = "🕸️";
    pub const DATA: &str = "🌸";

    pub fn layer(kind: LayerKind) -> &'static str {
        match kind {
            LayerKind::Text => Self::TEXT,
            LayerKind::LineArrow => Self::ARROW,
            LayerKind::Core => Self::CORE,
            LayerKind::Grid => Self::GRID,
            LayerKind::Data => Self::DATA,
        }
    }
}
