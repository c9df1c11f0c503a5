mod config_tests;
mod logger_tests;
