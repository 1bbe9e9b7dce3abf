pub mod audit;
pub mod replay;
pub mod serve;
pub mod tools;
