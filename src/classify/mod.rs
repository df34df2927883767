mod category;
mod classifier;
mod result;

pub use category::{WasteCategory, CATEGORY_COUNT, PRIORITY_ORDER};
pub use classifier::{categorize, classify, WasteClassifier};
pub use result::{ClassificationTally, Detection};
