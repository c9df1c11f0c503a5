mod prop_redact;
