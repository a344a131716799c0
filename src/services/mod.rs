pub mod analytics;
pub mod locations;
pub mod nearby;
pub mod ratings;
pub mod visits;
