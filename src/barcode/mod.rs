pub mod catalog;
pub mod transform;

pub use catalog::{BarcodeCatalog, SampleBarcodeMap};
pub use transform::{IndexTransform, TransformedIndex};
