pub mod flow_client;

pub use flow_client::FlowClient;
