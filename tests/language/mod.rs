mod tests_load;
mod tests_registry;
