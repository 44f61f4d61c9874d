pub mod consts;
pub mod error;
pub mod diagnostics;
pub mod math;
pub mod image_data;
pub mod volume;
pub mod plane;
pub mod reslice;
pub mod outline;
pub mod display;
pub mod layer;
pub mod blend;
pub mod composite;
pub mod model;
pub mod logic;
pub mod geometry;
pub mod phantom;
pub mod config;
pub mod io;
