pub mod datatable;
pub mod file_prompt;
mod input;
pub mod schema;
pub mod sql_editor;
