//! Request surface of a configuration server.
//!
//! Transports decode their calls into a [`ServiceRequest`] and hand it to
//! [`ConfigurationService::handle`], which always answers with a
//! structured success or [`ServiceFailure`].

mod configuration_service;
mod messages;

pub use configuration_service::*;
pub use messages::*;

#[cfg(test)]
mod configuration_service_test;
