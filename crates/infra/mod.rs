pub mod db;
pub mod metal_price_feed;
