pub mod accumulator;
pub mod breakeven;

pub use accumulator::dca_future_value;
pub use breakeven::{solve_breakeven, solve_breakeven_market_rate, SearchConfig, SearchStrategy};
