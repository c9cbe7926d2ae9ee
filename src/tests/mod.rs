pub mod support;
mod gateway_tests;
