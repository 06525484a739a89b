pub mod inventory;
pub mod item;
pub mod meal;
pub mod recommendation;
