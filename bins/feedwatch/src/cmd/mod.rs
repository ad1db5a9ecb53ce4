pub mod check;
pub mod stream;
