pub mod profiles;
pub mod serve;
