mod common;
mod service;
mod synthesis;
