//! Business Magnifier HTTP gateway.
//!
//! The binary (`magnifier`) wires configuration, the cache store, key rotation and the
//! admin script runner into [`gateway::create_router_with_state`].

pub mod gateway;
