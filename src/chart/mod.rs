//! Chart classification and number formatting shared by every renderer.

pub mod format;
pub mod normalize;

pub use format::{format_currency, format_number};
pub use normalize::{ChartView, PlotShape, RenderPlan, normalize};
