pub mod store;
pub mod types;

pub use store::ReservationRegistry;
pub use types::{Reservation, ReservationState};
