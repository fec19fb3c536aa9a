// Client proxy: admission, forwarding and fault rendering

pub mod fault_serializer;
pub mod handler;
pub mod op_monitoring;
pub mod precondition;
pub mod processor;

pub use fault_serializer::{send_error_response, FaultSerializer, X_ROAD_ERROR_HEADER};
pub use handler::{ClientProxy, ClientProxyHandler, ClientRestMessageHandler, REST_PROTOCOL_VERSION};
pub use processor::{HttpRestForwarder, RestForwarder};
