//! Symbol database application layer

mod build_usecase;
