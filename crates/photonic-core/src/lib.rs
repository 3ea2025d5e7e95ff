pub mod align;
pub mod cancel;
pub mod config;
pub mod consts;
pub mod detect;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod raw;
pub mod selection;
pub mod stack;
pub mod tools;
