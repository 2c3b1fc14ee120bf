//! # Domain Types
//!
//! The type model for feature values served by the API.
//!
//! ## Overview
//!
//! The server declares a [`DataType`] for every feature it returns. Raw JSON
//! values are decoded strictly against that declaration into a [`Value`];
//! the raw payload alone is never used to infer a type.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataType`] | Closed, recursive set of declared shapes |
//! | [`StructField`] | Named member of a struct data type |
//! | [`Value`] | Decoded value tagged with its data type |
//!
//! ## Decoding
//!
//! ```rust
//! use serde_json::json;
//! use tecton_core::{DataType, Value};
//!
//! let data_type = DataType::structure([("a", DataType::Int64), ("b", DataType::String)]);
//! let value = Value::decode(&data_type, &json!(["5", "x"])).unwrap();
//!
//! assert_eq!(value.to_json(), json!({ "a": 5, "b": "x" }));
//! ```

mod data_type;
mod value;

pub use data_type::{DataType, StructField};
pub use value::Value;
