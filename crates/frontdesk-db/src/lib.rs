mod documents;
mod error;
mod models;
mod repository;
mod schema;

pub use documents::*;
pub use error::DbError;
pub use models::*;
pub use repository::FrontdeskDb;
