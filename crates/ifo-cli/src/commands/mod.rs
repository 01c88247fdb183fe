pub mod quote;
pub mod simulate;
pub mod tax;
