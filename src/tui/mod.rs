pub mod contexts;
pub mod detail;
pub mod footer;
pub mod header;
pub mod list;
pub mod render;
pub mod spinner;
