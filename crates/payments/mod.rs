pub mod autopay_client;
