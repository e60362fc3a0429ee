pub mod amortization;
pub mod compare;
pub mod investing;
