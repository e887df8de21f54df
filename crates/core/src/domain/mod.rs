pub mod ids;
pub mod review;
pub mod settings;
pub mod ticket;
