pub mod image_helper;
pub mod image_sequence;
