pub mod barcode;
pub mod command;
pub mod demux;
pub mod fileformat;
pub mod runtime;
