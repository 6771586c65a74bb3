pub mod movement;
pub mod notification;
pub mod personnel;
