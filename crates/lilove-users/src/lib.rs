pub mod db;
pub mod error;
pub mod resolver;
pub mod resume;
pub mod types;

pub use error::UserError;
pub use resolver::UserStore;
pub use resume::ResumeKeyring;
pub use types::User;
