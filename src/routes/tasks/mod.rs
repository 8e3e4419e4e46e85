pub mod dto;
pub mod model;
pub mod pagination;
pub mod queries;
pub mod routes;
