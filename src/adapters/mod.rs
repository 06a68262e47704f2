// Adapters layer: concrete implementations for external systems (http server/client, onnx, storage).

pub mod client;
pub mod http;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod storage;
