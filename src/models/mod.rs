pub mod booking;
pub mod movie;
pub mod seat;
pub mod showtime;
pub mod theater;
pub mod user;

pub use booking::{Booking, NewBooking};
pub use movie::{Movie, NewMovie};
pub use seat::{ParseSeatLabelError, Seat, SeatCounts, SeatFilter, SeatLabel};
pub use showtime::{NewShowtime, Showtime, ShowtimeContext};
pub use theater::{NewTheater, Theater};
pub use user::{NewUser, Role, User};
