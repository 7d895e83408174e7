//! Generated protobuf types for the record the storage engine stores.
//! The engine treats `Record` as an opaque payload: it only ever sets
//! `offset` before encoding and reads it back after decoding.

tonic::include_proto!("log.v1");
