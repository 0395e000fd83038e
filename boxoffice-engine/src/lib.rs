pub mod catalog;
pub mod reaper;
pub mod reservation;

pub use catalog::EventCatalog;
pub use reaper::ExpiryReaper;
pub use reservation::ReservationEngine;
