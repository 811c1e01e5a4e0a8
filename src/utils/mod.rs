pub mod amount;

pub use amount::ui_to_raw;
