pub mod mock_http;

pub use mock_http::{CapturedRequest, spawn_mock_server};
