pub mod console;
pub mod progress_bar;
