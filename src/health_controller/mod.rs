mod main;
pub mod reconcile;

pub use main::*;
pub use reconcile::reconcile;
