mod tests_parse;
mod tests_parse_options;
mod tests_recovery;
