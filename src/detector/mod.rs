//! Client analyses that report findings over method bodies.

pub mod dead_code;
