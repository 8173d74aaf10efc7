pub mod caption;
pub mod etl;
pub mod imaging;
pub mod pipeline;
pub mod sheet;

pub use crate::domain::model::{PostBundle, PostOutcome, ProductRow, Record};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
