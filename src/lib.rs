//! Shelf application library: a book catalog HTTP service with a stateless
//! URL-normalization endpoint.

pub mod modules;
