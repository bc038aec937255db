pub mod certificate;
pub mod format;
pub mod text_layer;
pub mod translation;
