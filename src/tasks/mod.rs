pub mod action;
pub mod demo;
