//! The egui front end: a pure view model and the window that renders it.
pub mod call_app;
pub mod utils;
pub mod view_model;

pub use call_app::CallApp;
pub use view_model::{PrimaryAction, ViewModel};
