pub mod ocr;
pub mod speech;
