pub mod gitlab_webhook_route;
pub mod payload;
pub mod screen;
pub mod validate;
