pub mod accumulator;
pub mod consts;
pub mod densify;
pub mod error;
pub mod field;
pub mod io;
pub mod params;
pub mod patch;
pub mod preprocess;
