//! DTOs de la API HTTP

pub mod alert_dto;
pub mod api_response;

pub use alert_dto::{AlertActionRequest, DateRangeQuery};
pub use api_response::ApiResponse;
