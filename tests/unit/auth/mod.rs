mod test_manager;
