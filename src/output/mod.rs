pub mod bitbar;
mod styling;
mod tables;

pub use tables::render as render_table;
