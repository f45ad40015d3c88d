//! Terminal UI: task list and details, the plan, and a notes column.

mod app;
mod editor;
mod view;

pub use app::run;
