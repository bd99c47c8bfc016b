pub mod daily_passenger_count;
pub mod ticket;
