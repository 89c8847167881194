pub mod capture;
pub mod cli;
pub mod error;
pub mod model;
pub mod output;
pub mod packet;
pub mod session;
pub mod shutdown;
pub mod stats;
