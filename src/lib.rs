pub mod assign;
pub mod bitmap;
pub mod color;
pub mod common;
pub mod convert;
pub mod dedup;
pub mod encode;
pub mod histogram;
pub mod palette;
pub mod persist;
pub mod reduce;
pub mod select;
