pub mod channel;
pub mod generator;
pub mod stop;
