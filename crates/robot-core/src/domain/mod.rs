//! 도메인 모델.

mod market_record;
mod quote;
mod subscription;
mod trading;

pub use market_record::*;
pub use quote::*;
pub use subscription::*;
pub use trading::*;
