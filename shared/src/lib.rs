pub mod amount;
pub mod constants;
pub mod shared_spin_game;
pub mod validation;
pub mod wheel_geometry;
