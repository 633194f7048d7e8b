pub mod publish_token;

pub use publish_token::require_publish_token;
