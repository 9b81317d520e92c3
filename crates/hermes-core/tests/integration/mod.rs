mod common;
mod lifecycle_tests;
mod shape_tests;
