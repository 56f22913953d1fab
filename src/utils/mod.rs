pub mod clipboard;
pub mod dependencies;
pub mod display;
pub mod file;
pub mod interrupt;
pub mod settings;
