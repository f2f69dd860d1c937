pub mod average;
pub mod calib;
pub mod consts;
pub mod dark;
pub mod error;
pub mod filter;
pub mod frame;
pub mod io;
pub mod kernels;
pub mod pipeline;
pub mod reference;
pub mod shot;
