pub mod deadline;
pub mod request_id;

pub use deadline::deadline_middleware;
pub use request_id::{get_request_id, request_id_middleware};
