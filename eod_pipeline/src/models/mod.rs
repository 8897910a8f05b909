pub mod price_row;
pub mod run_date;
pub mod symbol;

pub use price_row::PriceRow;
pub use run_date::RunDate;
pub use symbol::Symbol;
