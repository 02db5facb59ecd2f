pub mod invocation;
pub mod locator;
pub mod paths;
pub mod runner;
