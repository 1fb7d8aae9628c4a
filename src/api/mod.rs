//! Request boundary
//!
//! The narrow, framework-agnostic surface between a transport (HTTP server,
//! batch file, tests) and the transfer engine:
//! - `request` - Decoded transfer requests and structural validation
//! - `response` - Status mapping and error bodies
//! - `handler` - The `TransferExchange` trait and the transfer endpoint

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{TransferExchange, TransferService};
pub use request::{AuthenticatedRequest, TransferRequest};
pub use response::{error_body, Response, Status};
