pub mod group_table;
pub mod panel;
pub mod throttle;
pub mod window;

pub use group_table::{GroupTable, RowUpdate, UpdateSource, WindowChange};
pub use panel::GroupPanel;
pub use window::{visible_range, Anchors};
