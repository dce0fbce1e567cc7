pub mod classes;
pub mod reports;
