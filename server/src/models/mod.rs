pub mod event;
pub mod reservation;
pub mod user;

pub use event::{Event, EventSummary, NewEvent};
pub use reservation::{NewReservation, Reservation, ReservationUpdate};
pub use user::User;
