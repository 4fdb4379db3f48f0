pub mod settings;
pub mod transform_cache;
