pub mod backend_spin_game;
