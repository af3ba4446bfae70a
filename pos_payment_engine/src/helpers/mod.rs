mod callback_url;
mod order_id;

pub use callback_url::with_token_in_url;
pub use order_id::{default_order_id, order_id_for_time};
