mod find_by_id_tests;
mod find_one_tests;
mod find_tests;
mod redaction_tests;
