pub mod nodes;
pub mod rotate;
pub mod state;
