pub mod classifier;
pub mod confidence;
pub mod image_io;
pub mod mat_file;
pub mod mat_mask;
pub mod outcome;
pub mod pdf;
pub mod report;
pub mod segmenter;
