mod tests_edits;
mod tests_properties;
