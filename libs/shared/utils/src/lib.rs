pub mod credential;
pub mod extractor;
pub mod test_utils;
pub mod validation;
