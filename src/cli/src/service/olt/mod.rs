pub(crate) mod address;
pub(crate) mod connection;
pub(crate) mod decode;
pub(crate) mod record;
#[allow(clippy::module_inception)]
pub(crate) mod service;

pub(crate) use address::*;
pub(crate) use connection::*;
pub(crate) use record::*;
pub(crate) use service::*;
