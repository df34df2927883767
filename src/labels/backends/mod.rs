pub mod fixed;
pub mod http;

pub use fixed::FixedLabelDetector;
pub use http::HttpLabelDetector;
