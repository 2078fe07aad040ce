pub mod status_bar;
pub mod toast;
pub mod volume_input;
