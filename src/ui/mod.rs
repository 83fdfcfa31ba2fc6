pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, kind_label, muted, section, success, summary_row, warn};
pub use table::{columns_table, data_sets_table, inventory_table, layers_table, TableBuilder};
pub use theme::{theme, Theme};
