mod email_whitelist;
mod ids;

pub use email_whitelist::is_test_email;
pub use ids::{new_id, order_number_from_id};
