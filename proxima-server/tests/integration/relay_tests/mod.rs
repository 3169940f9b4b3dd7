mod test_reference_scenario;
mod test_stale_expiry;
